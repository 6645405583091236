use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

mod serde;

mod private {
    pub trait Sealed {}
}

pub trait Scope: private::Sealed + fmt::Debug + Send + Sync + 'static {
    fn scope_str(&self) -> Vec<&'static str>;

    fn space_delimited(&self) -> SpaceDelimitedScope {
        self.scope_str().into_iter().map(String::from).collect()
    }
}

/// Scope as carried on the wire: the authorization URL and the `scope` field
/// of token responses. Google may grant scopes this crate has no type for,
/// so the entries are kept as plain strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SpaceDelimitedScope(Vec<String>);

impl SpaceDelimitedScope {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn grants<S: Scope>(&self, scope: &S) -> bool {
        scope
            .scope_str()
            .into_iter()
            .all(|s| self.iter().any(|granted| granted == s))
    }
}

impl FromIterator<String> for SpaceDelimitedScope {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        let mut inner: Vec<String> = Vec::new();
        for s in iter {
            if !inner.contains(&s) {
                inner.push(s);
            }
        }
        Self(inner)
    }
}

impl FromStr for SpaceDelimitedScope {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.split_whitespace().map(String::from).collect())
    }
}

impl fmt::Display for SpaceDelimitedScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

macro_rules! scope {
    { $(
        $( #[$m:meta] )*
        $i0:ident $(. $i:ident)* ;
    )+ } => { ::paste::paste! { $(
        $( #[$m] )*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct [< $i0:camel $( $i:camel )* >];

        impl [< $i0:camel $( $i:camel )* >] {
            pub const STR: &'static str = concat!(
                "https://www.googleapis.com/auth/",
                stringify!($i0)
                $(, ".", stringify!($i))*
            );

            pub const fn new() -> Self {
                Self
            }
        }

        impl fmt::Display for [< $i0:camel $( $i:camel )* >] {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(Self::STR)
            }
        }

        impl FromStr for [< $i0:camel $( $i:camel )* >] {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s == Self::STR {
                    Ok(Self)
                } else {
                    Err(format!("expected {}", Self::STR))
                }
            }
        }

        impl private::Sealed for [< $i0:camel $( $i:camel )* >] {}

        impl Scope for [< $i0:camel $( $i:camel )* >] {
            fn scope_str(&self) -> Vec<&'static str> {
                vec![Self::STR]
            }
        }
    )+ } };
}

// https://developers.google.com/workspace/meet/api/guides/authenticate-authorize#meet-scopes
scope! {
    /// Create meeting spaces and manage the ones created by this app.
    meetings.space.created;
    /// Read any meeting space the user can access.
    meetings.space.readonly;
    /// Edit the settings of any meeting space the user owns.
    meetings.space.settings;
}

macro_rules! apply_all_scope {
    ($m:ident) => {
        $m! {
            meetings.space.created,
            meetings.space.readonly,
            meetings.space.settings
        }
    };
}

use apply_all_scope;
