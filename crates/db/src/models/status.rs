//! Status helper enums stored as lowercase `TEXT` columns.
//!
//! Each table constrains the column with a `CHECK (... IN (...))` listing the
//! same names the enum produces.

use std::str::FromStr;

use beatstore_core::error::CoreError;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Column value for this status.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $val ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $val => Ok(Self::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        concat!("Unknown ", stringify!($name), " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

define_status_enum! {
    /// Order lifecycle status.
    OrderStatus {
        Pending = "pending",
        Completed = "completed",
        Failed = "failed",
        Refunded = "refunded",
    }
}

define_status_enum! {
    /// Catalog visibility filter for the admin listing.
    CatalogStatus {
        Active = "active",
        Inactive = "inactive",
        All = "all",
    }
}

impl CatalogStatus {
    /// `is_active` value to filter on, `None` for every beat.
    pub fn is_active(self) -> Option<bool> {
        match self {
            Self::Active => Some(true),
            Self::Inactive => Some(false),
            Self::All => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_parses_column_values() {
        assert_eq!("refunded".parse::<OrderStatus>().unwrap(), OrderStatus::Refunded);
        assert_eq!(OrderStatus::Completed.as_str(), "completed");
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn catalog_status_maps_to_active_flag() {
        assert_eq!(CatalogStatus::Active.is_active(), Some(true));
        assert_eq!(CatalogStatus::Inactive.is_active(), Some(false));
        assert_eq!(CatalogStatus::All.is_active(), None);
    }
}
