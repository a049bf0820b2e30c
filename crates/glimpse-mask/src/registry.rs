use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError, RwLock,
};

use glimpse_types::mask::{MaskTarget, Rect};
use tracing::info;

/// Registry entry. Identity is the identity of the underlying element, not
/// its current bounds.
#[derive(Clone)]
pub struct MaskRegion(Arc<dyn MaskTarget>);

impl MaskRegion {
    pub fn new(target: Arc<dyn MaskTarget>) -> Self {
        Self(target)
    }

    pub fn target(&self) -> &dyn MaskTarget {
        self.0.as_ref()
    }

    fn same_element(&self, other: &Arc<dyn MaskTarget>) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(other) as *const (),
        )
    }
}

impl std::fmt::Debug for MaskRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MaskRegion").field(&self.0.label()).finish()
    }
}

/// Immutable view of the registry taken at one instant.
#[derive(Debug, Clone, Default)]
pub struct MaskSnapshot {
    regions: Vec<MaskRegion>,
}

impl MaskSnapshot {
    pub fn regions(&self) -> &[MaskRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Ordered, duplicate-free set of elements to redact. Safe to mutate while a
/// capture iterates a snapshot.
#[derive(Default)]
pub struct MaskRegistry {
    entries: RwLock<Vec<MaskRegion>>,
    verbose: bool,
}

impl MaskRegistry {
    pub fn new(verbose: bool) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            verbose,
        }
    }

    /// Returns `false` when the element was already registered.
    pub fn add(&self, target: Arc<dyn MaskTarget>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.iter().any(|entry| entry.same_element(&target)) {
            return false;
        }
        if self.verbose {
            info!("Sanitizing element {}", target.label());
        }
        entries.push(MaskRegion::new(target));
        true
    }

    /// Returns `false` when the element was not registered.
    pub fn remove(&self, target: &Arc<dyn MaskTarget>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let Some(pos) = entries.iter().position(|entry| entry.same_element(target)) else {
            return false;
        };
        if self.verbose {
            info!("Removing sanitized element {}", target.label());
        }
        entries.remove(pos);
        true
    }

    pub fn snapshot(&self) -> MaskSnapshot {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        MaskSnapshot {
            regions: entries.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Host-side element whose bounds and visibility can be updated in place.
#[derive(Debug)]
pub struct ElementHandle {
    label: String,
    bounds: Mutex<Rect>,
    visible: AtomicBool,
}

impl ElementHandle {
    pub fn new(label: impl Into<String>, bounds: Rect) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            bounds: Mutex::new(bounds),
            visible: AtomicBool::new(true),
        })
    }

    pub fn set_bounds(&self, bounds: Rect) {
        *self.bounds.lock().unwrap_or_else(PoisonError::into_inner) = bounds;
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }
}

impl MaskTarget for ElementHandle {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn bounds(&self) -> Rect {
        *self.bounds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(label: &str) -> Arc<dyn MaskTarget> {
        ElementHandle::new(label, Rect::new(0, 0, 10, 10))
    }

    #[test]
    fn add_is_idempotent() {
        let registry = MaskRegistry::new(false);
        let password = element("password");
        assert!(registry.add(password.clone()));
        assert!(!registry.add(password.clone()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn identical_bounds_are_distinct_elements() {
        let registry = MaskRegistry::new(false);
        registry.add(element("a"));
        registry.add(element("b"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn remove_non_member_is_noop() {
        let registry = MaskRegistry::new(true);
        let kept = element("kept");
        registry.add(kept.clone());
        assert!(!registry.remove(&element("stranger")));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&kept));
        assert!(!registry.remove(&kept));
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_stable_across_mutation() {
        let registry = MaskRegistry::new(false);
        let first = element("first");
        let second = element("second");
        registry.add(first.clone());
        registry.add(second);
        let snapshot = registry.snapshot();

        registry.remove(&first);
        registry.add(element("third"));

        let labels: Vec<_> = snapshot
            .regions()
            .iter()
            .map(|region| region.target().label())
            .collect();
        assert_eq!(labels, vec!["first", "second"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn element_handle_reflects_live_state() {
        let handle = ElementHandle::new("card", Rect::new(1, 2, 3, 4));
        handle.set_visible(false);
        handle.set_bounds(Rect::new(5, 6, 7, 8));
        assert!(!handle.is_visible());
        assert_eq!(handle.bounds(), Rect::new(5, 6, 7, 8));
    }
}
