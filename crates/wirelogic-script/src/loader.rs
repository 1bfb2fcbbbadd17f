//! RON script loader

use crate::error::{Error, Result};
use crate::kind::KindDef;
use crate::plot::PlotDef;
use indexmap::IndexMap;
use log::debug;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use wirelogic_core::{BlockLogic, BlockRegistry, BlockSchema, ConfigurableLogic, KindId};

/// Loaded script definitions
#[derive(Debug, Default)]
pub struct ScriptDefs {
    /// Block kinds by id, in load order
    pub kinds: IndexMap<KindId, KindDef>,
    /// Plots by name, in load order
    pub plots: IndexMap<String, PlotDef>,
}

impl ScriptDefs {
    /// Create empty definitions
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a kind definition
    pub fn get_kind(&self, id: &KindId) -> Option<&KindDef> {
        self.kinds.get(id)
    }

    /// Get a plot by name
    pub fn get_plot(&self, name: &str) -> Option<&PlotDef> {
        self.plots.get(name)
    }

    /// Register every script kind with `registry`
    ///
    /// Each kind becomes a passive block backed by [`ConfigurableLogic`].
    pub fn register_kinds(&self, registry: &mut BlockRegistry) -> Result<()> {
        for kind in self.kinds.values() {
            registry.register(kind.id.clone(), kind.schema.clone(), |init| {
                let logic: Rc<dyn BlockLogic> = Rc::new(ConfigurableLogic::new(init));
                Ok(logic)
            })?;
        }
        Ok(())
    }
}

/// Loader for RON block schemas and plots
pub struct Loader {
    defs: ScriptDefs,
}

impl Loader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            defs: ScriptDefs::new(),
        }
    }

    /// Load a single RON file, choosing the document type from its content
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        if content.contains("kinds:") {
            self.load_kinds_str(&content)
        } else if content.contains("blocks:") {
            self.load_plot_str(&content)
        } else {
            Err(Error::UnknownDocument(path.display().to_string()))
        }
    }

    /// Load a plot file
    pub fn load_plot_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let content = fs::read_to_string(path)?;
        self.load_plot_str(&content)
    }

    /// Parse and validate a single `{input, output}` schema
    pub fn load_schema_str(content: &str) -> Result<BlockSchema> {
        let schema: BlockSchema = ron::from_str(content)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load block kinds from a RON string
    pub fn load_kinds_str(&mut self, content: &str) -> Result<()> {
        #[derive(serde::Deserialize)]
        struct KindFile {
            kinds: Vec<KindDef>,
        }

        let file: KindFile = ron::from_str(content)?;
        for kind in file.kinds {
            kind.schema.validate()?;
            self.insert_kind(kind)?;
        }
        Ok(())
    }

    /// Add one kind definition
    pub fn insert_kind(&mut self, kind: KindDef) -> Result<()> {
        if self.defs.kinds.contains_key(&kind.id) {
            return Err(Error::DuplicateDefinition(kind.id.to_string()));
        }
        debug!("loaded kind {}", kind.id);
        self.defs.kinds.insert(kind.id.clone(), kind);
        Ok(())
    }

    /// Load a plot from a RON string
    pub fn load_plot_str(&mut self, content: &str) -> Result<()> {
        let plot = PlotDef::parse(content)?;
        if self.defs.plots.contains_key(&plot.name) {
            return Err(Error::DuplicateDefinition(plot.name));
        }
        debug!("loaded plot '{}'", plot.name);
        self.defs.plots.insert(plot.name.clone(), plot);
        Ok(())
    }

    /// Load all RON files from a directory, recursively, in file name order
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {:?}", path),
            )));
        }

        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        for file_path in entries {
            if file_path.extension().is_some_and(|e| e == "ron") {
                self.load_file(&file_path)?;
            } else if file_path.is_dir() {
                self.load_directory(&file_path)?;
            }
        }

        Ok(())
    }

    /// Finish loading and return the definitions
    pub fn finish(self) -> ScriptDefs {
        self.defs
    }

    /// Get the current definitions (for inspection during loading)
    pub fn defs(&self) -> &ScriptDefs {
        &self.defs
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
