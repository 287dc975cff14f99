//! Namespace hierarchy helpers.
//!
//! Namespaces are slash-delimited paths rooted at `/`. `/a/b` is a child of
//! `/a`, which is a child of `/`. `/ab` is not a child of `/a`.

/// The root namespace.
pub const ROOT: &str = "/";

/// Whether `namespace` is a strict descendant of `parent`.
#[must_use]
pub fn is_child_of(namespace: &str, parent: &str) -> bool {
    if parent == ROOT {
        return namespace != ROOT && namespace.starts_with('/');
    }

    namespace
        .strip_prefix(parent)
        .is_some_and(|rest| rest.len() > 1 && rest.starts_with('/'))
}

/// Whether `namespace` equals `parent` or is one of its descendants.
#[must_use]
pub fn is_within(namespace: &str, parent: &str) -> bool {
    namespace == parent || is_child_of(namespace, parent)
}

/// Whether `namespace` is a strict ancestor of `child`.
#[must_use]
pub fn is_parent_of(namespace: &str, child: &str) -> bool {
    is_child_of(child, namespace)
}

/// List the strict ancestors of a namespace, from the root down.
///
/// `/a/b/c` yields `["/", "/a", "/a/b"]`. The root has no ancestors.
#[must_use]
pub fn ancestors(namespace: &str) -> Vec<String> {
    if namespace == ROOT || !namespace.starts_with('/') {
        return Vec::new();
    }

    let mut out = vec![ROOT.to_string()];
    let mut current = String::new();
    let segments: Vec<&str> = namespace.split('/').filter(|s| !s.is_empty()).collect();

    if let Some((_, parents)) = segments.split_last() {
        for segment in parents {
            current.push('/');
            current.push_str(segment);
            out.push(current.clone());
        }
    }

    out
}
