use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::{Result, StreamError};

pub const LOCAL_SCHEME: &str = "file";

/// A scheme-qualified file location. The scheme selects the backend
/// serving the file, e.g. `gs://bucket/key` or `file:///tmp/notes.txt`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct RemoteUri {
    url: Url,
}

impl RemoteUri {
    /// Parse `input`, treating scheme-less paths as local files.
    pub fn parse(input: &str) -> Result<Self> {
        Self::parse_with_default(input, LOCAL_SCHEME)
    }

    /// Parse `input`, qualifying scheme-less paths with `default_scheme`.
    ///
    /// Single-letter schemes are Windows drive letters, not URI schemes.
    pub fn parse_with_default(
        input: &str,
        default_scheme: &str,
    ) -> Result<Self> {
        match Url::parse(input) {
            Ok(url) if url.scheme().len() > 1 => Ok(Self { url }),
            Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
                Self::qualify(input, default_scheme)
            }
            Err(err) => {
                Err(StreamError::InvalidUri(input.to_owned(), err.to_string()))
            }
        }
    }

    fn qualify(input: &str, scheme: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(StreamError::InvalidUri(
                input.to_owned(),
                "empty path".to_owned(),
            ));
        }

        if scheme == LOCAL_SCHEME {
            let path = Path::new(input);
            let absolute = if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()?.join(path)
            };
            let url = Url::from_file_path(&absolute).map_err(|_| {
                StreamError::InvalidUri(
                    input.to_owned(),
                    "not a valid local path".to_owned(),
                )
            })?;
            return Ok(Self { url });
        }

        let qualified = format!("{}://{}", scheme, input);
        let url = Url::parse(&qualified).map_err(|err| {
            StreamError::InvalidUri(input.to_owned(), err.to_string())
        })?;
        Ok(Self { url })
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }

    /// Local path of a `file://` URI.
    pub fn to_file_path(&self) -> Result<PathBuf> {
        if self.scheme() != LOCAL_SCHEME {
            return Err(StreamError::InvalidUri(
                self.as_str().to_owned(),
                "not a local file URI".to_owned(),
            ));
        }
        self.url.to_file_path().map_err(|_| {
            StreamError::InvalidUri(
                self.as_str().to_owned(),
                "cannot be converted to a local path".to_owned(),
            )
        })
    }

    /// Object key for object-store style backends: host and path joined,
    /// without the leading slash. `mem://bucket/a/b` maps to `bucket/a/b`.
    pub fn key(&self) -> String {
        let host = self.url.host_str().unwrap_or("");
        format!("{}{}", host, self.url.path())
            .trim_start_matches('/')
            .to_owned()
    }
}

impl fmt::Display for RemoteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RemoteUri {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("gs://my-bucket/notes.txt", "gs", "my-bucket/notes.txt")]
    #[case("s3://bucket/a/b.csv", "s3", "bucket/a/b.csv")]
    #[case("hdfs://namenode/user/data", "hdfs", "namenode/user/data")]
    #[case("mem://a", "mem", "a")]
    #[case("mem:///a", "mem", "a")]
    fn parse_qualified(
        #[case] input: &str,
        #[case] scheme: &str,
        #[case] key: &str,
    ) {
        let uri = RemoteUri::parse(input).unwrap();
        assert_eq!(uri.scheme(), scheme);
        assert_eq!(uri.key(), key);
    }

    #[test]
    fn scheme_less_path_is_local() {
        let uri = RemoteUri::parse("/tmp/notes.txt").unwrap();
        assert_eq!(uri.scheme(), LOCAL_SCHEME);
        assert_eq!(
            uri.to_file_path().unwrap(),
            PathBuf::from("/tmp/notes.txt")
        );
    }

    #[test]
    fn relative_path_is_made_absolute() {
        let uri = RemoteUri::parse("notes.txt").unwrap();
        let expected = std::env::current_dir().unwrap().join("notes.txt");
        assert_eq!(uri.to_file_path().unwrap(), expected);
    }

    #[test]
    fn scheme_less_path_uses_given_default() {
        let uri = RemoteUri::parse_with_default("bucket/key", "mem").unwrap();
        assert_eq!(uri.scheme(), "mem");
        assert_eq!(uri.key(), "bucket/key");
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(
            RemoteUri::parse(""),
            Err(StreamError::InvalidUri(..))
        ));
    }

    #[test]
    fn remote_uri_has_no_local_path() {
        let uri = RemoteUri::parse("gs://bucket/key").unwrap();
        assert!(uri.to_file_path().is_err());
    }
}
