//! Fixed-choice form values.
//!
//! Use the `define_choice!` macro to declare an enum whose variants map
//! one-to-one onto the exact strings the onboarding form submits.

/// Error returned when a string is not one of a choice's allowed values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("expected one of: {allowed}")]
pub struct ChoiceError {
    /// Comma-separated list of accepted values.
    pub allowed: String,
}

/// Macro to define a form choice enum.
///
/// Generates:
/// - `Serialize`/`Deserialize` using the wire strings
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - `ALL`, `as_str()`, `Display` and `FromStr`
///
/// # Example
///
/// ```rust
/// # use aichatflows_core::define_choice;
/// define_choice!(Size { Small => "S", Large => "L" });
///
/// assert_eq!("L".parse::<Size>(), Ok(Size::Large));
/// assert_eq!(Size::Small.as_str(), "S");
/// ```
#[macro_export]
macro_rules! define_choice {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The exact string used on the wire.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }

            /// Comma-separated list of accepted wire strings.
            #[must_use]
            pub fn allowed() -> String {
                Self::ALL
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::choice::ChoiceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| $crate::types::choice::ChoiceError {
                        allowed: Self::allowed(),
                    })
            }
        }
    };
}

define_choice!(Plan {
    Starter => "Starter",
    Pro => "Pro",
});

define_choice!(SubmissionMethod {
    Online => "Submit through this page",
    SecureLink => "Use sendsecure.ly",
    InPerson => "Request In-Person Setup",
});

define_choice!(DeliveryPickup {
    Delivery => "Delivery",
    Pickup => "Pickup",
    Both => "Both",
    None => "None",
});

define_choice!(CredentialsHandling {
    SecureEmail => "Sent via secure email",
    SecureLink => "Client sharing via secure link",
    InPerson => "In-person setup requested",
});

define_choice!(Platform {
    Instagram => "Instagram",
    Facebook => "Facebook",
    TikTok => "TikTok",
    WhatsApp => "WhatsApp",
    Other => "Other Platforms",
});

impl Plan {
    /// Whether this plan needs the additional Pro platform logins.
    #[must_use]
    pub const fn is_pro(self) -> bool {
        matches!(self, Self::Pro)
    }
}

impl SubmissionMethod {
    /// Disposition recorded for logins supplied through this method.
    #[must_use]
    pub const fn credentials_handling(self) -> CredentialsHandling {
        match self {
            Self::Online => CredentialsHandling::SecureEmail,
            Self::SecureLink => CredentialsHandling::SecureLink,
            Self::InPerson => CredentialsHandling::InPerson,
        }
    }

    /// Whether logins are typed into the onboarding page itself.
    #[must_use]
    pub const fn captures_credentials(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl DeliveryPickup {
    /// Whether the business offers delivery.
    #[must_use]
    pub const fn offers_delivery(self) -> bool {
        matches!(self, Self::Delivery | Self::Both)
    }

    /// Whether the business offers pickup.
    #[must_use]
    pub const fn offers_pickup(self) -> bool {
        matches!(self, Self::Pickup | Self::Both)
    }
}
