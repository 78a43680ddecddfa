use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environment handed to the external build process.
///
/// The build never sees the ambient process environment directly: the driver resolves
/// this value once against a snapshot of the ambient variables and passes exactly the
/// result to the child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEnvironment {
    /// Start from the ambient variables (otherwise start empty)
    #[serde(default = "default_inherit")]
    pub inherit: bool,

    /// Variables stripped after inheriting
    #[serde(default)]
    pub remove: Vec<String>,

    /// Variables set last, overriding inherited values
    #[serde(default)]
    pub set: BTreeMap<String, String>,
}

fn default_inherit() -> bool {
    true
}

impl Default for BuildEnvironment {
    fn default() -> Self {
        Self {
            inherit: default_inherit(),
            remove: Vec::new(),
            set: BTreeMap::new(),
        }
    }
}

impl BuildEnvironment {
    /// Compute the child environment from `ambient`, sorted by name
    pub fn resolve<I>(&self, ambient: I) -> Vec<(String, String)>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut vars: BTreeMap<String, String> = if self.inherit {
            ambient.into_iter().collect()
        } else {
            BTreeMap::new()
        };

        for name in &self.remove {
            vars.remove(name);
        }
        for (name, value) in &self.set {
            vars.insert(name.clone(), value.clone());
        }

        vars.into_iter().collect()
    }
}
