//! Fixed string tags of the OAuth wire format.

use std::fmt;
use std::str::FromStr;

use ::serde::{de, Deserialize, Serialize};

macro_rules! tag {
    { $(
        $( #[$m:meta] )*
        $name:ident = $s:literal;
    )+ } => { ::paste::paste! { $(
        $( #[$m] )*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name(());

        struct [< $name Visitor >];

        impl $name {
            pub const STR: &'static str = $s;

            pub const fn new() -> Self {
                Self(())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(Self::STR)
            }
        }

        impl FromStr for $name {
            type Err = &'static str;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s == Self::STR {
                    Ok(Self::new())
                } else {
                    Err(concat!("not ", $s))
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: ::serde::Serializer,
            {
                serializer.serialize_str(Self::STR)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_str([< $name Visitor >])
            }
        }

        impl de::Visitor<'_> for [< $name Visitor >] {
            type Value = $name;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str(concat!("a str \"", $s, "\""))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }
    )+ } };
}

tag! {
    /// `grant_type` of a code exchange.
    AuthorizationCode = "authorization_code";
    /// `grant_type` of an access-token refresh.
    RefreshToken = "refresh_token";
    /// `token_type` of every Google token response.
    Bearer = "Bearer";
    /// `type` of a persisted user credential.
    AuthorizedUser = "authorized_user";
}
