use std::sync::Arc;

/// A hierarchical name in the design, such as `top.counter.count`.
#[derive(Ord, PartialOrd, Eq, PartialEq, Clone, Hash)]
pub struct Path(Arc<String>);

impl Path {
    pub fn parent(&self) -> Path {
        match self.rsplit_once('.') {
            Some((parent, _name)) => parent.into(),
            None => "".into(),
        }
    }

    /// The last component of the path.
    pub fn name(&self) -> &str {
        self.rsplit('.').next().unwrap_or(&self.0)
    }

    pub fn set(&self) -> Path {
        format!("{self}.set").into()
    }

    pub fn is_set(&self) -> bool {
        self.ends_with(".set")
    }

    /// Every proper ancestor of this path, outermost first.
    pub fn ancestors(&self) -> Vec<Path> {
        let parts: Vec<&str> = self.split('.').collect();
        (1..parts.len()).map(|n| parts[..n].join(".").into()).collect()
    }

    /// The space-separated form debuggers use to name items and scopes.
    pub fn to_identifier(&self) -> String {
        self.replace('.', " ")
    }
}

impl std::ops::Deref for Path {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self)
    }
}

impl std::fmt::Debug for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Path").field(&*self.0).finish()
    }
}

impl From<String> for Path {
    fn from(path: String) -> Path {
        Path(Arc::new(path))
    }
}

impl From<&str> for Path {
    fn from(path: &str) -> Path {
        path.to_string().into()
    }
}

#[test]
fn path_identifiers() {
    let path: Path = "top.counter.count".into();
    assert_eq!(path.parent(), Path::from("top.counter"));
    assert_eq!(path.name(), "count");
    assert_eq!(path.to_identifier(), "top counter count");
    assert_eq!(path.ancestors(), vec![Path::from("top"), Path::from("top.counter")]);
    assert!(path.set().is_set());
}
