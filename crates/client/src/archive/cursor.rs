//! Mutable catalog cursor, rendered from immutable hierarchy paths.

use std::ops::Deref;

/// Label stack below a fixed root label.
///
/// Every push goes through [`PathCursor::enter`] and every pop through
/// [`PathCursor::leave`], so the two counters can be compared after a unit.
#[derive(Debug, Clone)]
pub struct PathCursor {
    root: String,
    labels: Vec<String>,
    enters: usize,
    leaves: usize,
}

impl PathCursor {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into(), labels: Vec::new(), enters: 0, leaves: 0 }
    }

    pub fn enter(&mut self, label: impl Into<String>) {
        self.labels.push(label.into());
        self.enters += 1;
    }

    /// Pop one label. The root is never popped.
    pub fn leave(&mut self) -> Option<String> {
        let label = self.labels.pop()?;
        self.leaves += 1;
        Some(label)
    }

    pub fn go_to_parent(&mut self) {
        self.leave();
    }

    /// Replace the whole stack below the root.
    pub fn set<S: AsRef<str>>(&mut self, labels: &[S]) {
        self.restore(0);
        for label in labels {
            self.enter(label.as_ref());
        }
    }

    /// Pop back to `depth`; a deeper target is a no-op.
    pub fn restore(&mut self, depth: usize) {
        while self.labels.len() > depth {
            self.leave();
        }
    }

    /// Number of labels below the root.
    pub fn depth(&self) -> usize {
        self.labels.len()
    }

    /// Root and labels joined with `/`.
    pub fn render(&self) -> String {
        std::iter::once(self.root.as_str())
            .chain(self.labels.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// `(enter, leave)` call counts so far.
    pub fn counts(&self) -> (usize, usize) {
        (self.enters, self.leaves)
    }

    /// Enter `labels` for the lifetime of the returned guard.
    pub fn scope<S: AsRef<str>>(&mut self, labels: &[S]) -> CursorScope<'_> {
        let mut scope = CursorScope { cursor: self, pushed: 0 };
        for label in labels {
            scope.enter(label.as_ref());
        }
        scope
    }
}

/// Guard that pops everything it pushed when dropped.
#[derive(Debug)]
pub struct CursorScope<'a> {
    cursor: &'a mut PathCursor,
    pushed: usize,
}

impl CursorScope<'_> {
    pub fn enter(&mut self, label: impl Into<String>) {
        self.cursor.enter(label);
        self.pushed += 1;
    }
}

impl Deref for CursorScope<'_> {
    type Target = PathCursor;

    fn deref(&self) -> &PathCursor {
        self.cursor
    }
}

impl Drop for CursorScope<'_> {
    fn drop(&mut self) {
        for _ in 0..self.pushed {
            self.cursor.leave();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_leave_render() {
        let mut cursor = PathCursor::new("EDSITEment");
        cursor.enter("Student Resources");
        cursor.enter("Maps");
        assert_eq!(cursor.render(), "EDSITEment/Student Resources/Maps");
        assert_eq!(cursor.leave().as_deref(), Some("Maps"));
        cursor.go_to_parent();
        assert_eq!(cursor.leave(), None);
        assert_eq!(cursor.render(), "EDSITEment");
        assert_eq!(cursor.counts(), (2, 2));
    }

    #[test]
    fn test_set_replaces_stack() {
        let mut cursor = PathCursor::new("root");
        cursor.enter("a");
        cursor.set(&["b", "c"]);
        assert_eq!(cursor.render(), "root/b/c");
        cursor.restore(0);
        let (enters, leaves) = cursor.counts();
        assert_eq!(enters, leaves);
    }

    #[test]
    fn test_scope_pops_on_drop() {
        let mut cursor = PathCursor::new("root");
        cursor.enter("outer");
        {
            let mut scope = cursor.scope(&["Lesson Plans", "History"]);
            scope.enter("RESOURCES");
            assert_eq!(scope.render(), "root/outer/Lesson Plans/History/RESOURCES");
            assert_eq!(scope.depth(), 4);
        }
        assert_eq!(cursor.render(), "root/outer");
        assert_eq!(cursor.counts(), (4, 3));
    }

    #[test]
    fn test_scope_pops_on_early_return() {
        fn failing(cursor: &mut PathCursor) -> Result<(), &'static str> {
            let _scope = cursor.scope(&["a", "b"]);
            Err("boom")
        }

        let mut cursor = PathCursor::new("root");
        assert!(failing(&mut cursor).is_err());
        assert_eq!(cursor.depth(), 0);
        let (enters, leaves) = cursor.counts();
        assert_eq!(enters, leaves);
    }
}
