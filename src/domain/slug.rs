//! Page slugs: derivation from titles and shape validation.
//!
//! Slugs double as route segments in the folder tree, so they are restricted
//! to lowercase ASCII letters, digits and single hyphens.

use std::future::Future;

use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("`{slug}` is not a valid slug")]
    Invalid { slug: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive a base slug from human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Accept `slug` only if it is already in canonical form.
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    let canonical = !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-');

    if canonical {
        Ok(())
    } else {
        Err(SlugError::Invalid {
            slug: slug.to_string(),
        })
    }
}

/// Derive a slug from `input` that the async `is_unique` predicate accepts,
/// suffixing `-2`, `-3`, … on collisions.
pub async fn generate_unique_slug_async<F, Fut, E>(
    input: &str,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(input)?;

    if is_unique(base.clone())
        .await
        .map_err(SlugAsyncError::Predicate)?
    {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if is_unique(candidate.clone())
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    #[test]
    fn derive_slug_normalizes_titles() {
        assert_eq!(derive_slug("Getting Started!").expect("slug"), "getting-started");
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn validate_slug_accepts_only_canonical_form() {
        assert!(validate_slug("release-notes-2").is_ok());
        assert!(validate_slug("Release").is_err());
        assert!(validate_slug("a--b").is_err());
        assert!(validate_slug("-lead").is_err());
        assert!(validate_slug("with/slash").is_err());
        assert!(validate_slug("").is_err());
    }

    #[tokio::test]
    async fn unique_slug_appends_counter() {
        let taken = ["faq".to_string(), "faq-2".to_string()];
        let slug = generate_unique_slug_async("FAQ", |candidate| {
            let free = !taken.contains(&candidate);
            async move { Ok::<_, Infallible>(free) }
        })
        .await
        .expect("unique slug");

        assert_eq!(slug, "faq-3");
    }
}
