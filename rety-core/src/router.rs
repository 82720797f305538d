//! Routing between named editing surfaces
//!
//! Recording and replay both address surfaces by id. A router built from a
//! single surface names it `default`; one built from a list derives each id
//! from a `lang-`/`language-` marker, falling back to the surface's raw
//! class string.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Result, RetyError};
use crate::surface::EditSurface;

/// Id given to a lone surface
pub const DEFAULT_SURFACE: &str = "default";

fn language_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"^lang(uage)?-").expect("static regex is valid"))
}

/// Derive a routing id from a surface's markers
pub fn surface_id<S: EditSurface>(surface: &S) -> String {
    let markers = surface.markers();
    markers
        .iter()
        .find(|m| language_marker().is_match(m))
        .map(|m| language_marker().replace(m, "").into_owned())
        .unwrap_or_else(|| markers.join(" "))
}

/// Maps ids to surfaces and tracks the active one
#[derive(Debug)]
pub struct SurfaceRouter<S> {
    surfaces: Vec<(String, S)>,
    active: Option<String>,
}

impl<S: EditSurface> SurfaceRouter<S> {
    /// Route to a single surface, registered as `default`
    pub fn single(surface: S) -> Self {
        Self {
            surfaces: vec![(DEFAULT_SURFACE.to_string(), surface)],
            active: None,
        }
    }

    /// Route to a list of surfaces, naming each from its markers
    pub fn from_surfaces(mut surfaces: Vec<S>) -> Self {
        if surfaces.len() == 1 {
            if let Some(surface) = surfaces.pop() {
                return Self::single(surface);
            }
        }

        let surfaces = surfaces
            .into_iter()
            .map(|surface| (surface_id(&surface), surface))
            .collect();
        Self {
            surfaces,
            active: None,
        }
    }

    /// Route to explicitly named surfaces, in iteration order
    pub fn from_map<I, K>(surfaces: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
    {
        Self {
            surfaces: surfaces
                .into_iter()
                .map(|(id, surface)| (id.into(), surface))
                .collect(),
            active: None,
        }
    }

    /// Number of routed surfaces
    pub fn count(&self) -> usize {
        self.surfaces.len()
    }

    /// Registered ids in routing order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.surfaces.iter().map(|(id, _)| id.as_str())
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.surfaces.iter().any(|(known, _)| known == id)
    }

    fn unknown(&self, id: &str) -> RetyError {
        RetyError::UnknownEditor {
            id: id.to_string(),
            known: self.ids().collect::<Vec<_>>().join(", "),
        }
    }

    /// Id of the surface actions currently go to.
    ///
    /// The sole surface if there is only one, else the most recently
    /// activated, else `default`, else the first registered.
    pub fn active_id(&self) -> Option<&str> {
        if self.surfaces.len() == 1 {
            return self.surfaces.first().map(|(id, _)| id.as_str());
        }
        if let Some(active) = &self.active {
            return Some(active.as_str());
        }
        self.surfaces
            .iter()
            .find(|(id, _)| id == DEFAULT_SURFACE)
            .or_else(|| self.surfaces.first())
            .map(|(id, _)| id.as_str())
    }

    /// Make `id` the active surface
    pub fn switch_to(&mut self, id: &str) -> Result<()> {
        if !self.contains_id(id) {
            return Err(self.unknown(id));
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    /// Surface by id
    pub fn get(&self, id: &str) -> Result<&S> {
        self.surfaces
            .iter()
            .find(|(known, _)| known == id)
            .map(|(_, surface)| surface)
            .ok_or_else(|| self.unknown(id))
    }

    /// Mutable surface by id
    pub fn get_mut(&mut self, id: &str) -> Result<&mut S> {
        match self.surfaces.iter().position(|(known, _)| known == id) {
            Some(index) => Ok(&mut self.surfaces[index].1),
            None => Err(self.unknown(id)),
        }
    }

    /// The surface named by `id`, or the active one when `id` is `None`
    pub fn active(&self, id: Option<&str>) -> Result<&S> {
        match id.or(self.active_id()) {
            Some(id) => self.get(id),
            None => Err(self.unknown("")),
        }
    }

    /// Mutable form of [`SurfaceRouter::active`]
    pub fn active_mut(&mut self, id: Option<&str>) -> Result<&mut S> {
        let id = match id.or(self.active_id()) {
            Some(id) => id.to_string(),
            None => return Err(self.unknown("")),
        };
        self.get_mut(&id)
    }

    /// Id of the first surface whose content contains `target`
    pub fn resolve(&self, target: &str) -> Option<&str> {
        self.surfaces
            .iter()
            .find(|(_, surface)| surface.contains(target))
            .map(|(id, _)| id.as_str())
    }

    /// Iterate over `(id, surface)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &S)> {
        self.surfaces.iter().map(|(id, s)| (id.as_str(), s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::TextBuffer;

    #[test]
    fn test_single_surface_is_default() {
        let router = SurfaceRouter::single(TextBuffer::new("only"));
        assert_eq!(router.count(), 1);
        assert_eq!(router.active_id(), Some(DEFAULT_SURFACE));
        assert_eq!(router.active(None).unwrap().identity(), "only");
    }

    #[test]
    fn test_one_element_list_is_default() {
        let router = SurfaceRouter::from_surfaces(vec![
            TextBuffer::new("a").with_marker("language-css"),
        ]);
        assert_eq!(router.ids().collect::<Vec<_>>(), vec![DEFAULT_SURFACE]);
    }

    #[test]
    fn test_ids_from_language_markers() {
        let router = SurfaceRouter::from_surfaces(vec![
            TextBuffer::new("a").with_marker("editor").with_marker("language-css"),
            TextBuffer::new("b").with_marker("lang-html"),
            TextBuffer::new("c").with_marker("plain").with_marker("box"),
        ]);

        assert_eq!(router.ids().collect::<Vec<_>>(), vec!["css", "html", "plain box"]);
        // No default registered and nothing active yet: first surface wins
        assert_eq!(router.active_id(), Some("css"));
    }

    #[test]
    fn test_default_preferred_over_first() {
        let router = SurfaceRouter::from_map(vec![
            ("js", TextBuffer::new("js")),
            ("default", TextBuffer::new("main")),
        ]);
        assert_eq!(router.active_id(), Some("default"));
    }

    #[test]
    fn test_switch_and_unknown_editor() {
        let mut router = SurfaceRouter::from_map(vec![
            ("css", TextBuffer::new("css")),
            ("html", TextBuffer::new("html")),
        ]);

        router.switch_to("html").unwrap();
        assert_eq!(router.active(None).unwrap().identity(), "html");
        assert_eq!(router.active(Some("css")).unwrap().identity(), "css");

        let err = router.switch_to("js").unwrap_err();
        match err {
            RetyError::UnknownEditor { id, known } => {
                assert_eq!(id, "js");
                assert_eq!(known, "css, html");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(router.active_id(), Some("html"));
    }

    #[test]
    fn test_resolve_targets() {
        let router = SurfaceRouter::from_map(vec![
            ("css", TextBuffer::new("css-root").with_target("css-line")),
            ("html", TextBuffer::new("html-root")),
        ]);

        assert_eq!(router.resolve("css-line"), Some("css"));
        assert_eq!(router.resolve("html-root"), Some("html"));
        assert_eq!(router.resolve("elsewhere"), None);
    }
}
