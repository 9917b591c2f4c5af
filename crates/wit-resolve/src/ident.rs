use semver::Version;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

/// A namespaced, optionally versioned identifier of a package, world or
/// interface, such as `wasi:io@0.2.0` or `wasi:clocks/wall-clock@0.2.0`.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(into = "String", try_from = "String"))]
pub struct Ident {
    /// A namespace such as `wasi` in `wasi:foo/bar`.
    pub namespace: String,
    /// The kebab-name of the package, which is always specified.
    pub package: String,
    /// Optional world or interface name following the `/`.
    pub extension: Option<String>,
    /// Optional semver version following the `@`.
    pub version: Option<Version>,
}

/// Errors returned when parsing an [`Ident`].
#[derive(Debug, thiserror::Error)]
pub enum ParseIdentError {
    #[error("missing package namespace")]
    MissingNamespace,
    #[error("missing package name")]
    MissingPackage,
    #[error("missing name after `/`")]
    MissingExtension,
    #[error("invalid version `{version}`")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },
    #[error("invalid character {ch:?} in `{name}`")]
    InvalidChar { name: String, ch: char },
    #[error("invalid leading `-` in `{0}`")]
    LeadingHyphen(String),
    #[error("invalid double `--` in `{0}`")]
    DoubleHyphen(String),
    #[error("invalid trailing `-` in `{0}`")]
    TrailingHyphen(String),
}

impl Ident {
    /// Parses `s` as `namespace:package[/extension][@version]`.
    ///
    /// Each of the three name components may carry a leading `%` which is
    /// stripped before validation, allowing names that collide with WIT
    /// keywords.
    pub fn parse(s: &str) -> Result<Ident, ParseIdentError> {
        let (name, version) = match s.rsplit_once('@') {
            Some((name, version)) => {
                let parsed =
                    Version::parse(version).map_err(|source| ParseIdentError::InvalidVersion {
                        version: version.to_string(),
                        source,
                    })?;
                (name, Some(parsed))
            }
            None => (s, None),
        };
        let (base, extension) = match name.split_once('/') {
            Some((base, ext)) => (base, Some(unescape(ext))),
            None => (name, None),
        };
        let (namespace, package) = match base.split_once(':') {
            Some((ns, pkg)) => (unescape(ns), unescape(pkg)),
            None => (unescape(base), ""),
        };

        if namespace.is_empty() {
            return Err(ParseIdentError::MissingNamespace);
        }
        if package.is_empty() {
            return Err(ParseIdentError::MissingPackage);
        }
        validate_name(namespace)?;
        validate_name(package)?;
        if let Some(ext) = extension {
            if ext.is_empty() {
                return Err(ParseIdentError::MissingExtension);
            }
            validate_name(ext)?;
        }

        Ok(Ident {
            namespace: namespace.to_string(),
            package: package.to_string(),
            extension: extension.map(|s| s.to_string()),
            version,
        })
    }

    /// Returns this identifier with `extension` as its `/`-suffix.
    pub fn with_extension(&self, extension: &str) -> Ident {
        Ident {
            extension: Some(extension.to_string()),
            ..self.clone()
        }
    }

    /// Returns this identifier with any version removed.
    pub fn unversioned(&self) -> Ident {
        Ident {
            version: None,
            ..self.clone()
        }
    }

    /// Returns just the `namespace:package[@version]` portion of this
    /// identifier.
    pub fn package_name(&self) -> Ident {
        Ident {
            extension: None,
            ..self.clone()
        }
    }
}

fn unescape(s: &str) -> &str {
    s.strip_prefix('%').unwrap_or(s)
}

/// Validates a single kebab-case component of an identifier.
///
/// ASCII letters, digits and `-` only. A lowercase letter can't directly
/// follow an uppercase one, an uppercase letter only starts a word or
/// follows an uppercase letter, digit or `-`, and digits must follow an
/// alphanumeric character.
fn validate_name(s: &str) -> Result<(), ParseIdentError> {
    let invalid = |ch| ParseIdentError::InvalidChar {
        name: s.to_string(),
        ch,
    };
    let mut prev: Option<char> = None;
    for ch in s.chars() {
        match ch {
            'a'..='z' => {
                if matches!(prev, Some('A'..='Z')) {
                    return Err(invalid(ch));
                }
            }
            'A'..='Z' => match prev {
                None | Some('A'..='Z' | '0'..='9' | '-') => {}
                Some(_) => return Err(invalid(ch)),
            },
            '0'..='9' => match prev {
                Some('a'..='z' | 'A'..='Z' | '0'..='9') => {}
                _ => return Err(invalid(ch)),
            },
            '-' => match prev {
                None => return Err(ParseIdentError::LeadingHyphen(s.to_string())),
                Some('-') => return Err(ParseIdentError::DoubleHyphen(s.to_string())),
                Some(_) => {}
            },
            _ => return Err(invalid(ch)),
        }
        prev = Some(ch);
    }
    if prev == Some('-') {
        return Err(ParseIdentError::TrailingHyphen(s.to_string()));
    }
    Ok(())
}

/// Names which must be written with a leading `%` to be used as identifiers.
const KEYWORDS: &[&str] = &[
    "as",
    "async",
    "bool",
    "borrow",
    "char",
    "constructor",
    "enum",
    "error-context",
    "export",
    "f32",
    "f64",
    "flags",
    "float32",
    "float64",
    "from",
    "func",
    "future",
    "import",
    "include",
    "interface",
    "list",
    "option",
    "own",
    "package",
    "record",
    "resource",
    "result",
    "s16",
    "s32",
    "s64",
    "s8",
    "static",
    "stream",
    "string",
    "tuple",
    "type",
    "u16",
    "u32",
    "u64",
    "u8",
    "use",
    "variant",
    "with",
    "world",
];

struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if KEYWORDS.contains(&self.0) {
            f.write_str("%")?;
        }
        f.write_str(self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", Escaped(&self.namespace), Escaped(&self.package))?;
        if let Some(ext) = &self.extension {
            write!(f, "/{}", Escaped(ext))?;
        }
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}

impl FromStr for Ident {
    type Err = ParseIdentError;

    fn from_str(s: &str) -> Result<Ident, ParseIdentError> {
        Ident::parse(s)
    }
}

impl From<Ident> for String {
    fn from(id: Ident) -> String {
        id.to_string()
    }
}

impl TryFrom<String> for Ident {
    type Error = ParseIdentError;

    fn try_from(s: String) -> Result<Ident, ParseIdentError> {
        Ident::parse(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident(ns: &str, pkg: &str, ext: Option<&str>, version: Option<&str>) -> Ident {
        Ident {
            namespace: ns.to_string(),
            package: pkg.to_string(),
            extension: ext.map(|s| s.to_string()),
            version: version.map(|v| Version::parse(v).unwrap()),
        }
    }

    #[test]
    fn parse_valid() {
        let cases = [
            ("wasi:io", ident("wasi", "io", None, None)),
            ("wasi:io@0.2.0", ident("wasi", "io", None, Some("0.2.0"))),
            ("wasi:io/streams", ident("wasi", "io", Some("streams"), None)),
            (
                "wasi:io/streams@0.2.0",
                ident("wasi", "io", Some("streams"), Some("0.2.0")),
            ),
            ("%use:%own", ident("use", "own", None, None)),
            ("%use:%own@0.2.0", ident("use", "own", None, Some("0.2.0"))),
            ("%use:%own/%type", ident("use", "own", Some("type"), None)),
            (
                "%use:%own/%type@0.2.0",
                ident("use", "own", Some("type"), Some("0.2.0")),
            ),
            (
                "wasi:http/types@0.3.0-rc-2025-08-15",
                ident("wasi", "http", Some("types"), Some("0.3.0-rc-2025-08-15")),
            ),
        ];
        for (s, want) in cases {
            let got = Ident::parse(s).unwrap_or_else(|e| panic!("failed to parse {s:?}: {e}"));
            assert_eq!(got, want, "parsing {s:?}");
        }
    }

    #[test]
    fn parse_invalid() {
        let cases = [
            "",
            ":",
            ":/",
            ":/@",
            "wasi",
            "wasi:",
            "wasi:/",
            "wasi:clocks@",
            "wasi:clocks/wall-clock@",
            "foo%:bar%baz",
            "wasi:io/",
            "wasi:-io",
            "wasi:io-",
            "wasi:i--o",
            "wasi:1io",
            "wasi:iO",
        ];
        for s in cases {
            assert!(Ident::parse(s).is_err(), "expected error parsing {s:?}");
        }
    }

    #[test]
    fn error_kinds() {
        assert!(matches!(
            Ident::parse(""),
            Err(ParseIdentError::MissingNamespace)
        ));
        assert!(matches!(
            Ident::parse("wasi"),
            Err(ParseIdentError::MissingPackage)
        ));
        assert!(matches!(
            Ident::parse("wasi:clocks@"),
            Err(ParseIdentError::InvalidVersion { .. })
        ));
        assert!(matches!(
            Ident::parse("foo%:bar"),
            Err(ParseIdentError::InvalidChar { ch: '%', .. })
        ));
        assert!(matches!(
            Ident::parse("wasi:a--b"),
            Err(ParseIdentError::DoubleHyphen(_))
        ));
    }

    #[test]
    fn case_runs() {
        assert!(validate_name("HTTP-client").is_ok());
        assert!(validate_name("http2").is_ok());
        assert!(validate_name("ABC").is_ok());
        assert!(validate_name("a-B").is_ok());
        assert!(validate_name("aB").is_err());
        assert!(validate_name("Ab").is_err());
        assert!(validate_name("a_b").is_err());
    }

    #[test]
    fn round_trip() {
        for s in [
            "wasi:io",
            "wasi:io@0.2.0",
            "wasi:io/streams",
            "wasi:io/streams@0.2.0",
            "%use:%own",
            "%use:%own/%type@0.2.0",
            "foo:bar/%interface",
        ] {
            assert_eq!(Ident::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn version_split_on_last_at() {
        let id = Ident::parse("a:b/c@1.0.0+build").unwrap();
        assert_eq!(id.extension.as_deref(), Some("c"));
        assert_eq!(id.version, Some(Version::parse("1.0.0+build").unwrap()));
    }

    #[test]
    fn helpers() {
        let id = Ident::parse("wasi:io@0.2.0").unwrap();
        assert_eq!(id.with_extension("poll").to_string(), "wasi:io/poll@0.2.0");
        assert_eq!(
            id.with_extension("poll").unversioned().to_string(),
            "wasi:io/poll"
        );
        assert_eq!(
            Ident::parse("wasi:io/poll@0.2.0")
                .unwrap()
                .package_name()
                .to_string(),
            "wasi:io@0.2.0"
        );
    }
}
