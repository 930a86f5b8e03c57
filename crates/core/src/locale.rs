//! Supported locales and the fixed copy used in contracts and emails.
//!
//! Unknown or missing locale tags fall back to English rather than failing
//! a purchase.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl Locale {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
        }
    }

    /// Parse a BCP-47-ish tag (`"es"`, `"es-MX"`, `"EN_us"`), falling back to English.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "es" => Self::Es,
            _ => Self::En,
        }
    }

    pub fn contract_copy(self) -> &'static ContractCopy {
        match self {
            Self::En => &CONTRACT_EN,
            Self::Es => &CONTRACT_ES,
        }
    }

    pub fn email_copy(self) -> &'static EmailCopy {
        match self {
            Self::En => &EMAIL_EN,
            Self::Es => &EMAIL_ES,
        }
    }

    /// Date format used on documents.
    pub fn date_format(self) -> &'static str {
        match self {
            Self::En => "%B %-d, %Y",
            Self::Es => "%d/%m/%Y",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels printed on a license contract.
#[derive(Debug)]
pub struct ContractCopy {
    pub title: &'static str,
    pub order_number: &'static str,
    pub date: &'static str,
    pub licensee: &'static str,
    pub email: &'static str,
    pub beat: &'static str,
    pub license: &'static str,
    pub price: &'static str,
    pub rights: &'static str,
    pub streams: &'static str,
    pub physical_sales: &'static str,
    pub unlimited: &'static str,
    pub exclusive_clause: &'static str,
    pub non_exclusive_clause: &'static str,
    pub files: &'static str,
}

/// Subject and body fragments of the order confirmation email.
#[derive(Debug)]
pub struct EmailCopy {
    pub subject: &'static str,
    pub greeting: &'static str,
    pub intro: &'static str,
    pub items: &'static str,
    pub total: &'static str,
    pub download_here: &'static str,
    pub guest_notice: &'static str,
    pub user_notice: &'static str,
    pub sign_off: &'static str,
}

static CONTRACT_EN: ContractCopy = ContractCopy {
    title: "Beat License Agreement",
    order_number: "Order number",
    date: "Date",
    licensee: "Licensee",
    email: "Email",
    beat: "Beat",
    license: "License",
    price: "Price",
    rights: "Granted rights",
    streams: "Streams",
    physical_sales: "Physical sales",
    unlimited: "Unlimited",
    exclusive_clause: "This is an exclusive license. The beat is withdrawn from further sale.",
    non_exclusive_clause: "This is a non-exclusive license. The licensor may license the beat to others.",
    files: "Included files",
};

static CONTRACT_ES: ContractCopy = ContractCopy {
    title: "Contrato de Licencia de Beat",
    order_number: "Número de pedido",
    date: "Fecha",
    licensee: "Licenciatario",
    email: "Correo",
    beat: "Beat",
    license: "Licencia",
    price: "Precio",
    rights: "Derechos otorgados",
    streams: "Reproducciones",
    physical_sales: "Ventas físicas",
    unlimited: "Ilimitado",
    exclusive_clause: "Esta es una licencia exclusiva. El beat se retira de la venta.",
    non_exclusive_clause: "Esta es una licencia no exclusiva. El licenciante puede licenciar el beat a terceros.",
    files: "Archivos incluidos",
};

static EMAIL_EN: EmailCopy = EmailCopy {
    subject: "Your order",
    greeting: "Hi",
    intro: "Thanks for your purchase. Here is your order summary:",
    items: "Items",
    total: "Total",
    download_here: "Download your files here",
    guest_notice: "This link expires in 30 days and allows 3 downloads.",
    user_notice: "Your downloads are available in your account for 30 days.",
    sign_off: "Happy creating!",
};

static EMAIL_ES: EmailCopy = EmailCopy {
    subject: "Tu pedido",
    greeting: "Hola",
    intro: "Gracias por tu compra. Este es el resumen de tu pedido:",
    items: "Artículos",
    total: "Total",
    download_here: "Descarga tus archivos aquí",
    guest_notice: "Este enlace caduca en 30 días y permite 3 descargas.",
    user_notice: "Tus descargas están disponibles en tu cuenta durante 30 días.",
    sign_off: "¡A crear!",
};
