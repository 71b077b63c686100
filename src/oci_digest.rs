use std::fmt;

use crate::{Error, Result};

// https://github.com/opencontainers/image-spec/blob/main/descriptor.md#digests
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OciDigest {
    algorithm: RegisteredImageSpecAlgorithm,
    encoded: String,
}

impl TryFrom<&str> for OciDigest {
    type Error = Error;
    fn try_from(s: &str) -> Result<Self> {
        let i = match s.find(':') {
            Some(i) => i,
            None => return Err(Error::InvalidDigest(s.to_string())),
        };
        let algo: &str = match s.get(..i) {
            Some(a) => a,
            None => return Err(Error::InvalidDigest(s.to_string())),
        };
        let encoded: &str = match s.get(i + 1..) {
            Some(e) if !e.is_empty() => e,
            Some(_) => return Err(Error::InvalidDigest(s.to_string())),
            None => return Err(Error::InvalidDigest(s.to_string())),
        };
        let algorithm = match algo {
            "sha256" => RegisteredImageSpecAlgorithm::Sha256,
            "sha512" => RegisteredImageSpecAlgorithm::Sha512,
            _ => {
                return Err(Error::InvalidDigest(s.to_string()));
            }
        };

        // the encoded portion ends up as a url path segment
        if !encoded
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(Error::InvalidDigest(s.to_string()));
        }

        Ok(Self {
            algorithm,
            encoded: encoded.to_string(),
        })
    }
}

impl TryFrom<&String> for OciDigest {
    type Error = Error;
    fn try_from(s: &String) -> Result<Self> {
        s.as_str().try_into()
    }
}

impl fmt::Display for OciDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", String::from(&self.algorithm), self.encoded)
    }
}

impl From<&OciDigest> for String {
    fn from(d: &OciDigest) -> String {
        d.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum RegisteredImageSpecAlgorithm {
    Sha256,
    Sha512,
}

impl From<&RegisteredImageSpecAlgorithm> for String {
    fn from(a: &RegisteredImageSpecAlgorithm) -> String {
        match a {
            RegisteredImageSpecAlgorithm::Sha512 => String::from("sha512"),
            RegisteredImageSpecAlgorithm::Sha256 => String::from("sha256"),
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case::sha256("sha256:aaa", Ok(OciDigest {
        algorithm: RegisteredImageSpecAlgorithm::Sha256,
        encoded: String::from("aaa"),
    }))]
    #[case::sha512("sha512:0123abcdef", Ok(OciDigest {
        algorithm: RegisteredImageSpecAlgorithm::Sha512,
        encoded: String::from("0123abcdef"),
    }))]
    #[case::unknown_algorithm("sha666:aaa", Err(Error::InvalidDigest(String::from("sha666:aaa"))))]
    #[case::no_separator("sha256aaa", Err(Error::InvalidDigest(String::from("sha256aaa"))))]
    #[case::empty_encoded("sha256:", Err(Error::InvalidDigest(String::from("sha256:"))))]
    #[case::empty_algorithm(":aaa", Err(Error::InvalidDigest(String::from(":aaa"))))]
    #[case::path_traversal("sha256:../../x", Err(Error::InvalidDigest(String::from("sha256:../../x"))))]
    fn validate_try_from(#[case] input: &str, #[case] expected: Result<OciDigest>) {
        let actual: Result<OciDigest> = input.try_into();
        match (expected, actual) {
            (Ok(exp), Ok(act)) => {
                assert_eq!(exp, act);
            }
            (Ok(s), Err(e)) => {
                panic!("expected Ok( {s:?} ) got Err( {e:?} )");
            }
            (Err(exp), Err(act)) => {
                let exp = format!("{exp}");
                let act = format!("{act}");
                assert_eq!(exp, act);
            }
            (Err(e), Ok(s)) => {
                panic!("expected Err( {e:?} ) got Ok( {s:?} )");
            }
        }
    }

    #[test]
    fn display_round_trips_input() {
        let digest: OciDigest = "sha256:c0ffee".try_into().unwrap();
        assert_eq!(digest.to_string(), "sha256:c0ffee");
    }
}
