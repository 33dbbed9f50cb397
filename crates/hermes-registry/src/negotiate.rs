//! Content negotiation within a descriptor group.

use crate::error::NegotiationError;
use crate::media_type::{parse_accept, quality, MediaRange, MediaType};
use crate::registry::{DescriptorGroup, Registered};

/// Returns the offered type with the highest non-zero quality; ties keep offer order.
fn best_match<'a>(
    ranges: &[MediaRange],
    offered: impl IntoIterator<Item = &'a MediaType>,
) -> Option<&'a MediaType> {
    let mut best: Option<(&MediaType, f32)> = None;
    for media_type in offered {
        let q = quality(ranges, media_type);
        if q > 0.0 && best.map_or(true, |(_, best_q)| q > best_q) {
            best = Some((media_type, q));
        }
    }
    best.map(|(media_type, _)| media_type)
}

impl<H> DescriptorGroup<H> {
    /// Selects one member for the given Accept and Content-Type headers.
    ///
    /// 1. The produces type is the candidate type Accept rates highest.
    /// 2. The consumes type is chosen the same way against Content-Type,
    ///    offering members that produce the resolved type first, then the
    ///    rest, then the super-type of the resolved produces type.
    /// 3. An exact `(consumes, produces)` member wins. Otherwise a member with
    ///    the same produces whose consumes shares the top-level type and ends
    ///    with the requested subtype is chosen.
    ///
    /// A missing Accept or Content-Type counts as `*/*`. A Content-Type that is
    /// present but not a concrete media type is `UnsupportedMediaType`. The
    /// result depends only on the group and the two header values.
    pub fn negotiate(
        &self,
        accept: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<&Registered<H>, NegotiationError> {
        let candidates = self.candidates();

        let accept_ranges = parse_accept(accept);
        let produces = best_match(
            &accept_ranges,
            candidates.iter().map(|c| c.descriptor().produces()),
        )
        .ok_or_else(|| NegotiationError::NotAcceptable {
            accept: accept.unwrap_or("*/*").to_string(),
            available: self.available(),
        })?;

        let super_type = produces.super_type();
        let (same, other): (Vec<_>, Vec<_>) = candidates
            .iter()
            .partition(|c| c.descriptor().produces() == produces);
        let offered = same
            .iter()
            .chain(other.iter())
            .map(|c| c.descriptor().consumes())
            .chain(std::iter::once(&super_type));
        let unsupported = || NegotiationError::UnsupportedMediaType {
            content_type: content_type.unwrap_or("*/*").to_string(),
            available: self.available(),
        };
        let content_ranges = match content_type.map(str::trim).filter(|v| !v.is_empty()) {
            None => vec![MediaRange::any()],
            Some(value) => {
                let declared = MediaType::parse(value).map_err(|_| unsupported())?;
                vec![MediaRange::exact(&declared)]
            }
        };
        let consumes = best_match(&content_ranges, offered).ok_or_else(unsupported)?;

        let exact = candidates.iter().find(|c| {
            c.descriptor().produces() == produces && c.descriptor().consumes() == consumes
        });
        let selected = exact.or_else(|| {
            candidates.iter().find(|c| {
                let registered = c.descriptor().consumes();
                c.descriptor().produces() == produces
                    && registered.top_level() == consumes.top_level()
                    && registered.subtype().ends_with(consumes.subtype())
            })
        });

        match selected {
            Some(candidate) => {
                tracing::trace!(
                    http.method = %self.method(),
                    http.route = %self.path(),
                    consumes = %candidate.descriptor().consumes(),
                    produces = %candidate.descriptor().produces(),
                    fallback = exact.is_none(),
                    "Negotiated handler"
                );
                Ok(candidate)
            }
            None => Err(unsupported()),
        }
    }
}
