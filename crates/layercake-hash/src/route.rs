// SPDX-License-Identifier: Apache-2.0
//! Route parsing: `/tableKey@ref(sliceId,sliceId)/tableKey2.../propertyKey`.
//!
//! A [`Route`] is ordered outermost-first: `segments[0]` names the
//! outermost container a route addresses (e.g. a cake), `segments.last()`
//! names the innermost one (e.g. a component), and an optional trailing
//! `property_key` on the route as a whole names a scalar field of that
//! innermost record. `Db::get` therefore resolves a route left to right
//! (root container first, recursing into named children); `Db::insert`
//! walks it right to left (innermost child hashed and written first, so its
//! hash is available to substitute into the parent it's written under).

use crate::error::HashError;
use crate::hash::ContentHash;
use crate::time_id::is_time_id;

/// A resolved or unresolved revision pointer on a route segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteRef {
    /// An explicit content-hash revision (`hasHistoryRef`).
    Hash(ContentHash),
    /// A `timeId` resolved indirectly via insert-history (`hasDefaultRef`).
    TimeId(String),
}

impl RouteRef {
    fn parse(raw: &str) -> Self {
        if is_time_id(raw) {
            Self::TimeId(raw.to_string())
        } else if let Some(hash) = ContentHash::from_hex(raw) {
            Self::Hash(hash)
        } else {
            // Not a well-formed hash or timeId; preserved as an opaque
            // timeId-shaped ref so `flat()` still round-trips. Resolution
            // against storage will fail with `RefNotFound` at the core
            // layer, which is where ref validity is actually checked.
            Self::TimeId(raw.to_string())
        }
    }

    fn flat(&self) -> String {
        match self {
            Self::Hash(h) => h.to_string(),
            Self::TimeId(t) => t.clone(),
        }
    }
}

/// One segment of a [`Route`]: a table key plus optional revision ref,
/// covered slice ids, and (only meaningful on the last segment) a property
/// key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSegment {
    table_key: String,
    slice_ids: Vec<String>,
    route_ref: Option<RouteRef>,
}

impl RouteSegment {
    /// The segment's table key.
    #[must_use]
    pub fn table_key(&self) -> &str {
        &self.table_key
    }

    /// The slice ids named in `(sliceId,sliceId)`, if any.
    #[must_use]
    pub fn slice_ids(&self) -> &[String] {
        &self.slice_ids
    }

    /// `true` if this segment has a `(sliceId,...)` clause.
    #[must_use]
    pub fn has_slice_ids(&self) -> bool {
        !self.slice_ids.is_empty()
    }

    /// The segment's revision ref, if any.
    #[must_use]
    pub fn route_ref(&self) -> Option<&RouteRef> {
        self.route_ref.as_ref()
    }

    /// `true` if this segment carries a `@ref`.
    #[must_use]
    pub fn has_ref(&self) -> bool {
        self.route_ref.is_some()
    }

    /// `true` if the ref is a `timeId` (resolved indirectly via history).
    #[must_use]
    pub fn has_default_ref(&self) -> bool {
        matches!(self.route_ref, Some(RouteRef::TimeId(_)))
    }

    /// `true` if the ref is an explicit content hash.
    #[must_use]
    pub fn has_history_ref(&self) -> bool {
        matches!(self.route_ref, Some(RouteRef::Hash(_)))
    }

    fn flat(&self) -> String {
        let mut out = self.table_key.clone();
        if let Some(r) = &self.route_ref {
            out.push('@');
            out.push_str(&r.flat());
        }
        if !self.slice_ids.is_empty() {
            out.push('(');
            out.push_str(&self.slice_ids.join(","));
            out.push(')');
        }
        out
    }

    fn equals_without_ref(&self, other: &Self) -> bool {
        self.table_key == other.table_key && self.slice_ids == other.slice_ids
    }
}

fn is_lower_camel_case(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric())
}

fn parse_segment_token(token: &str, route_text: &str) -> Result<RouteSegment, HashError> {
    if token.is_empty() {
        return Err(HashError::InvalidRoute {
            route: route_text.to_string(),
            reason: "empty segment".to_string(),
        });
    }
    let (before_parens, slice_ids) = match token.find('(') {
        Some(idx) => {
            if !token.ends_with(')') {
                return Err(HashError::InvalidRoute {
                    route: route_text.to_string(),
                    reason: format!("unterminated slice-id clause in {token:?}"),
                });
            }
            let inner = &token[idx + 1..token.len() - 1];
            let ids: Vec<String> = if inner.is_empty() {
                Vec::new()
            } else {
                inner.split(',').map(str::to_string).collect()
            };
            (&token[..idx], ids)
        }
        None => (token, Vec::new()),
    };
    let (table_key, route_ref) = match before_parens.split_once('@') {
        Some((key, raw_ref)) => {
            if raw_ref.is_empty() {
                return Err(HashError::InvalidRoute {
                    route: route_text.to_string(),
                    reason: format!("empty ref in {token:?}"),
                });
            }
            (key, Some(RouteRef::parse(raw_ref)))
        }
        None => (before_parens, None),
    };
    if !is_lower_camel_case(table_key) {
        return Err(HashError::InvalidRoute {
            route: route_text.to_string(),
            reason: format!("table key {table_key:?} is not lower-camel-case"),
        });
    }
    Ok(RouteSegment {
        table_key: table_key.to_string(),
        slice_ids,
        route_ref,
    })
}

/// A non-empty, ordered path through the catalog: `cake -> layer ->
/// component`, with an optional trailing scalar property key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    segments: Vec<RouteSegment>,
    property_key: Option<String>,
}

impl Route {
    /// Build a route from already-parsed segments and an optional trailing
    /// property key.
    ///
    /// # Errors
    /// Returns [`HashError::InvalidRoute`] if `segments` is empty or
    /// `property_key` is not lower-camel-case.
    pub fn new(
        segments: Vec<RouteSegment>,
        property_key: Option<String>,
    ) -> Result<Self, HashError> {
        if segments.is_empty() {
            return Err(HashError::InvalidRoute {
                route: String::new(),
                reason: "route must have at least one segment".to_string(),
            });
        }
        if let Some(key) = &property_key {
            if !is_lower_camel_case(key) {
                return Err(HashError::InvalidRoute {
                    route: String::new(),
                    reason: format!("property key {key:?} is not lower-camel-case"),
                });
            }
        }
        Ok(Self {
            segments,
            property_key,
        })
    }

    /// Parse a flat route string with no trailing property key — used for
    /// routes that address a whole record (`insert`/`get` targets).
    ///
    /// # Errors
    /// Returns [`HashError::InvalidRoute`] on a malformed or empty route.
    pub fn from_flat(s: &str) -> Result<Self, HashError> {
        Self::parse(s, false)
    }

    /// Parse a flat route string whose final path component is a scalar
    /// property key rather than a table segment — used for column routes
    /// (`ColumnSelection`, `SetValue`, filter/sort column references).
    ///
    /// # Errors
    /// Returns [`HashError::InvalidRoute`] on a malformed, empty, or
    /// single-component route (a property route needs at least one table
    /// segment plus the property).
    pub fn from_flat_with_property(s: &str) -> Result<Self, HashError> {
        Self::parse(s, true)
    }

    fn parse(s: &str, trailing_property: bool) -> Result<Self, HashError> {
        let trimmed = s.strip_prefix('/').unwrap_or(s);
        if trimmed.is_empty() {
            return Err(HashError::InvalidRoute {
                route: s.to_string(),
                reason: "route is empty".to_string(),
            });
        }
        let mut tokens: Vec<&str> = trimmed.split('/').collect();
        if tokens.iter().any(|t| t.is_empty()) {
            return Err(HashError::InvalidRoute {
                route: s.to_string(),
                reason: "route contains an empty segment".to_string(),
            });
        }
        let property_key = if trailing_property {
            if tokens.len() < 2 {
                return Err(HashError::InvalidRoute {
                    route: s.to_string(),
                    reason: "property route needs a table segment and a property".to_string(),
                });
            }
            let last = tokens.pop().unwrap_or_default();
            if !is_lower_camel_case(last) {
                return Err(HashError::InvalidRoute {
                    route: s.to_string(),
                    reason: format!("property key {last:?} is not lower-camel-case"),
                });
            }
            Some(last.to_string())
        } else {
            None
        };
        let segments = tokens
            .into_iter()
            .map(|t| parse_segment_token(t, s))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(segments, property_key)
    }

    /// The route's segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    /// The outermost (root) segment.
    #[must_use]
    pub fn root(&self) -> &RouteSegment {
        // `segments` is never empty: `new`/`parse` reject empty routes.
        &self.segments[0]
    }

    /// The innermost (leaf) segment.
    #[must_use]
    pub fn leaf(&self) -> &RouteSegment {
        // `segments` is never empty: `new`/`parse` reject empty routes.
        &self.segments[self.segments.len() - 1]
    }

    /// `true` if the route names exactly one segment.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.len() == 1
    }

    /// The trailing scalar property key, if the route names one.
    #[must_use]
    pub fn property_key(&self) -> Option<&str> {
        self.property_key.as_deref()
    }

    /// `true` if the route names a trailing property key.
    #[must_use]
    pub fn has_property_key(&self) -> bool {
        self.property_key.is_some()
    }

    /// A route over the same segments and property key, dropping every
    /// segment's ref. Used to key observer registries and to compare two
    /// routes "without refs".
    #[must_use]
    pub fn without_refs(&self) -> Self {
        let segments = self
            .segments
            .iter()
            .map(|s| RouteSegment {
                table_key: s.table_key.clone(),
                slice_ids: s.slice_ids.clone(),
                route_ref: None,
            })
            .collect();
        Self {
            segments,
            property_key: self.property_key.clone(),
        }
    }

    /// Structural equality ignoring every segment's ref.
    #[must_use]
    pub fn equals_without_refs(&self, other: &Self) -> bool {
        self.property_key == other.property_key
            && self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.equals_without_ref(b))
    }

    /// A route over the same segments with the superior (outermost)
    /// segment dropped, keeping the same trailing property key. `None` if
    /// this route already has a single segment.
    #[must_use]
    pub fn without_root(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[1..].to_vec(),
            property_key: self.property_key.clone(),
        })
    }

    /// The canonical flat string form of this route.
    #[must_use]
    pub fn flat(&self) -> String {
        let mut out = String::from("/");
        out.push_str(
            &self
                .segments
                .iter()
                .map(RouteSegment::flat)
                .collect::<Vec<_>>()
                .join("/"),
        );
        if let Some(key) = &self.property_key {
            out.push('/');
            out.push_str(key);
        }
        out
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.flat())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_route() {
        let r = Route::from_flat("/carGeneral").unwrap();
        assert_eq!(Route::from_flat(&r.flat()).unwrap(), r);
        assert_eq!(r.flat(), "/carGeneral");
    }

    #[test]
    fn round_trips_nested_route() {
        let r = Route::from_flat("/carCake/carGeneralLayer/carGeneral").unwrap();
        assert_eq!(r.segments().len(), 3);
        assert_eq!(Route::from_flat(&r.flat()).unwrap(), r);
    }

    #[test]
    fn round_trips_property_route() {
        let r =
            Route::from_flat_with_property("/carCake/carGeneralLayer/carGeneral/brand").unwrap();
        assert_eq!(r.segments().len(), 3);
        assert_eq!(r.property_key(), Some("brand"));
        assert_eq!(
            Route::from_flat_with_property(&r.flat()).unwrap(),
            r
        );
    }

    #[test]
    fn parses_ref_and_slice_ids() {
        let r = Route::from_flat("/carCake@1700000000000:Ab3Z(VIN5,VIN6)").unwrap();
        let seg = r.root();
        assert!(seg.has_default_ref());
        assert_eq!(seg.slice_ids(), &["VIN5".to_string(), "VIN6".to_string()]);
    }

    #[test]
    fn parses_history_ref_as_hash() {
        let hash = crate::hash::calc_hash(&serde_json::json!({"a": 1}));
        let route_text = format!("/carCake@{hash}");
        let r = Route::from_flat(&route_text).unwrap();
        assert!(r.root().has_history_ref());
        assert!(!r.root().has_default_ref());
    }

    #[test]
    fn rejects_empty_route() {
        assert!(Route::from_flat("").is_err());
        assert!(Route::from_flat("/").is_err());
    }

    #[test]
    fn rejects_non_camel_case_table_key() {
        assert!(Route::from_flat("/Car_General").is_err());
    }

    #[test]
    fn equals_without_refs_ignores_ref_only() {
        let a = Route::from_flat("/carCake@1700000000000:Ab3Z").unwrap();
        let b = Route::from_flat("/carCake@1700000000001:Zz99").unwrap();
        assert!(a.equals_without_refs(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn without_root_drops_outermost_segment() {
        let r = Route::from_flat("/carCake/carGeneralLayer/carGeneral").unwrap();
        let inner = r.without_root().unwrap();
        assert_eq!(inner.segments().len(), 2);
        assert_eq!(inner.root().table_key(), "carGeneralLayer");
    }

    #[test]
    fn without_root_of_single_segment_is_none() {
        let r = Route::from_flat("/carGeneral").unwrap();
        assert!(r.without_root().is_none());
    }

    #[test]
    fn is_root_true_only_for_single_segment() {
        assert!(Route::from_flat("/carGeneral").unwrap().is_root());
        assert!(!Route::from_flat("/carCake/carGeneralLayer")
            .unwrap()
            .is_root());
    }
}
