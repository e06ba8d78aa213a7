//! Payload transforms selected by armor label.
//!
//! A layer armored as anything other than `PGP MESSAGE` carries a
//! plaintext that must be transformed (typically decompressed) before
//! it can be parsed.  An [`Extension`] recognizes labels and supplies
//! the transform; [`Extensions`] tries extensions in the order they
//! were registered.
//!
//! # Examples
//!
//! ```
//! use remailer_parser::{Extension, Extensions, Transform};
//!
//! #[derive(Debug)]
//! struct Shout;
//!
//! impl Extension for Shout {
//!     fn transform(&self, label: &str) -> Option<Transform> {
//!         if label == "LOUD MESSAGE" {
//!             Some(Box::new(|bytes: Vec<u8>| Ok(bytes.to_ascii_uppercase())))
//!         } else {
//!             None
//!         }
//!     }
//! }
//!
//! let mut extensions = Extensions::new();
//! extensions.push(Shout);
//!
//! let transform = extensions.resolve("LOUD MESSAGE").unwrap();
//! assert_eq!(transform(b"hi".to_vec()).unwrap(), b"HI");
//! assert!(extensions.resolve("QUIET MESSAGE").is_none());
//! ```

use std::fmt;

use crate::Result;

/// Transforms a decrypted plaintext.
pub type Transform<'a> = Box<dyn FnOnce(Vec<u8>) -> Result<Vec<u8>> + 'a>;

/// Provides transforms for armor labels.
pub trait Extension: fmt::Debug + Send + Sync {
    /// Returns the transform for blocks labeled `label`, or `None` if
    /// this extension does not handle them.
    fn transform(&self, label: &str) -> Option<Transform>;
}

impl<E: Extension + ?Sized> Extension for Box<E> {
    fn transform(&self, label: &str) -> Option<Transform> {
        self.as_ref().transform(label)
    }
}

/// An ordered collection of extensions.
#[derive(Debug, Default)]
pub struct Extensions {
    extensions: Vec<Box<dyn Extension>>,
}

impl Extensions {
    /// Returns an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an extension.
    ///
    /// It is consulted after all previously added ones.
    pub fn push<E>(&mut self, extension: E)
        where E: Extension + 'static
    {
        self.extensions.push(Box::new(extension));
    }

    /// Returns the number of registered extensions.
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Returns whether no extension is registered.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Returns the transform of the first extension that handles
    /// `label`.
    pub fn resolve(&self, label: &str) -> Option<Transform> {
        self.extensions.iter()
            .enumerate()
            .find_map(|(i, e)| {
                let t = e.transform(label)?;
                log::debug!("extension #{} ({:?}) handles {:?}", i, e, label);
                Some(t)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Appends a fixed tag to the plaintext of one label.
    #[derive(Debug)]
    struct Tag {
        label: &'static str,
        tag: &'static [u8],
    }

    impl Extension for Tag {
        fn transform(&self, label: &str) -> Option<Transform> {
            if label != self.label {
                return None;
            }
            Some(Box::new(move |mut bytes: Vec<u8>| {
                bytes.extend_from_slice(self.tag);
                Ok(bytes)
            }))
        }
    }

    #[test]
    fn empty() {
        let extensions = Extensions::new();
        assert!(extensions.is_empty());
        assert!(extensions.resolve("PGPZ MESSAGE").is_none());
    }

    #[test]
    fn first_match_wins() {
        let mut extensions = Extensions::new();
        extensions.push(Tag { label: "A", tag: b"-first" });
        extensions.push(Tag { label: "B", tag: b"-b" });
        extensions.push(Tag { label: "A", tag: b"-second" });
        assert_eq!(extensions.len(), 3);

        let t = extensions.resolve("A").unwrap();
        assert_eq!(t(b"x".to_vec()).unwrap(), b"x-first");
        let t = extensions.resolve("B").unwrap();
        assert_eq!(t(b"x".to_vec()).unwrap(), b"x-b");
        assert!(extensions.resolve("C").is_none());
    }

    #[test]
    fn labels_are_case_sensitive() {
        let mut extensions = Extensions::new();
        extensions.push(Tag { label: "PGPZ MESSAGE", tag: b"" });
        assert!(extensions.resolve("pgpz message").is_none());
    }

    #[test]
    fn transform_failure() {
        #[derive(Debug)]
        struct Broken;
        impl Extension for Broken {
            fn transform(&self, _: &str) -> Option<Transform> {
                Some(Box::new(|_| Err(anyhow::anyhow!("broken"))))
            }
        }

        let mut extensions = Extensions::new();
        extensions.push(Broken);
        let t = extensions.resolve("anything").unwrap();
        assert_eq!(t(vec![]).unwrap_err().to_string(), "broken");
    }
}
