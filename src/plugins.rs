use crate::document::Document;
use crate::operators::Operator;
use crate::panels::Panel;
use crate::properties::PropertyGroupDef;
use anyhow::{anyhow, bail, Context, Result};
use libloading::Library;
use serde::Deserialize;
use std::any::Any;
use std::fmt;
use std::fs;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::ptr;

pub const EDITOR_PLUGIN_API_VERSION: u32 = 1;
pub const PLUGIN_ENTRY_SYMBOL: &[u8] = b"editor_plugin_entry\0";

#[repr(C)]
#[derive(Clone, Copy)]
pub struct PluginHandle {
    data: *mut (),
    vtable: *mut (),
}

impl PluginHandle {
    pub const fn null() -> Self {
        Self { data: ptr::null_mut(), vtable: ptr::null_mut() }
    }

    pub fn is_null(&self) -> bool {
        self.data.is_null() || self.vtable.is_null()
    }

    /// # Safety
    /// The handle must be turned back into a box exactly once, by a host built against the same
    /// `EditorPlugin` definition.
    pub unsafe fn from_box(plugin: Box<dyn EditorPlugin>) -> Self {
        let erased: (*mut (), *mut ()) = mem::transmute(Box::into_raw(plugin));
        Self { data: erased.0, vtable: erased.1 }
    }

    /// # Safety
    /// `self` must come from `from_box` and must not have been converted before.
    pub unsafe fn into_box(self) -> Box<dyn EditorPlugin> {
        let raw: *mut dyn EditorPlugin = mem::transmute((self.data, self.vtable));
        Box::from_raw(raw)
    }
}

pub type PluginEntryFn = unsafe extern "C" fn() -> PluginExport;
pub type PluginCreateFn = unsafe extern "C" fn() -> PluginHandle;

#[repr(C)]
pub struct PluginExport {
    pub api_version: u32,
    pub create: PluginCreateFn,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capability {
    PropertyGroup(String),
    Operator(String),
    Panel(String),
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::PropertyGroup(name) => write!(f, "property group '{name}'"),
            Capability::Operator(idname) => write!(f, "operator '{idname}'"),
            Capability::Panel(idname) => write!(f, "panel '{idname}'"),
        }
    }
}

struct Owned<T> {
    owner: String,
    value: T,
}

/// Everything plugins have registered with the host, tagged with the owning plugin's name.
#[derive(Default)]
pub struct CapabilityRegistry {
    property_groups: Vec<Owned<PropertyGroupDef>>,
    operators: Vec<Owned<Box<dyn Operator>>>,
    panels: Vec<Owned<Box<dyn Panel>>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, capability: &Capability) -> bool {
        match capability {
            Capability::PropertyGroup(name) => self.property_group(name).is_some(),
            Capability::Operator(idname) => {
                self.operators.iter().any(|slot| slot.value.idname() == idname.as_str())
            }
            Capability::Panel(idname) => self.panels.iter().any(|slot| slot.value.idname() == idname.as_str()),
        }
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        let groups =
            self.property_groups.iter().map(|slot| Capability::PropertyGroup(slot.value.name.to_string()));
        let operators =
            self.operators.iter().map(|slot| Capability::Operator(slot.value.idname().to_string()));
        let panels = self.panels.iter().map(|slot| Capability::Panel(slot.value.idname().to_string()));
        groups.chain(operators).chain(panels).collect()
    }

    pub fn owned_by(&self, owner: &str) -> Vec<Capability> {
        let groups = self
            .property_groups
            .iter()
            .filter(|slot| slot.owner == owner)
            .map(|slot| Capability::PropertyGroup(slot.value.name.to_string()));
        let operators = self
            .operators
            .iter()
            .filter(|slot| slot.owner == owner)
            .map(|slot| Capability::Operator(slot.value.idname().to_string()));
        let panels = self
            .panels
            .iter()
            .filter(|slot| slot.owner == owner)
            .map(|slot| Capability::Panel(slot.value.idname().to_string()));
        groups.chain(operators).chain(panels).collect()
    }

    pub fn property_group(&self, name: &str) -> Option<&PropertyGroupDef> {
        self.property_groups.iter().map(|slot| &slot.value).find(|def| def.name == name)
    }

    pub fn operator(&self, idname: &str) -> Option<&dyn Operator> {
        self.operators.iter().find(|slot| slot.value.idname() == idname).map(|slot| slot.value.as_ref())
    }

    pub fn operator_mut(&mut self, idname: &str) -> Option<&mut (dyn Operator + 'static)> {
        self.operators.iter_mut().find(|slot| slot.value.idname() == idname).map(|slot| slot.value.as_mut())
    }

    pub fn panels(&self) -> impl Iterator<Item = &dyn Panel> {
        self.panels.iter().map(|slot| slot.value.as_ref())
    }

    fn insert_property_group(&mut self, owner: &str, def: PropertyGroupDef) -> Result<()> {
        self.ensure_vacant(&Capability::PropertyGroup(def.name.to_string()))?;
        self.property_groups.push(Owned { owner: owner.to_string(), value: def });
        Ok(())
    }

    fn insert_operator(&mut self, owner: &str, operator: Box<dyn Operator>) -> Result<()> {
        self.ensure_vacant(&Capability::Operator(operator.idname().to_string()))?;
        self.operators.push(Owned { owner: owner.to_string(), value: operator });
        Ok(())
    }

    fn insert_panel(&mut self, owner: &str, panel: Box<dyn Panel>) -> Result<()> {
        self.ensure_vacant(&Capability::Panel(panel.idname().to_string()))?;
        self.panels.push(Owned { owner: owner.to_string(), value: panel });
        Ok(())
    }

    fn ensure_vacant(&self, capability: &Capability) -> Result<()> {
        if self.contains(capability) {
            bail!("{capability} is already registered");
        }
        Ok(())
    }

    fn remove(&mut self, owner: &str, capability: &Capability) -> Result<()> {
        let removed = match capability {
            Capability::PropertyGroup(name) => {
                remove_owned(&mut self.property_groups, owner, |def| def.name == name.as_str())
            }
            Capability::Operator(idname) => {
                remove_owned(&mut self.operators, owner, |op| op.idname() == idname.as_str())
            }
            Capability::Panel(idname) => {
                remove_owned(&mut self.panels, owner, |panel| panel.idname() == idname.as_str())
            }
        };
        if !removed {
            bail!("{capability} is not registered by plugin '{owner}'");
        }
        Ok(())
    }

    /// Drops every capability owned by `owner`, panels first and property groups last.
    fn remove_all_owned(&mut self, owner: &str) {
        self.panels.retain(|slot| slot.owner != owner);
        self.operators.retain(|slot| slot.owner != owner);
        self.property_groups.retain(|slot| slot.owner != owner);
    }
}

fn remove_owned<T>(slots: &mut Vec<Owned<T>>, owner: &str, matches: impl Fn(&T) -> bool) -> bool {
    match slots.iter().position(|slot| slot.owner == owner && matches(&slot.value)) {
        Some(index) => {
            slots.remove(index);
            true
        }
        None => false,
    }
}

/// What a plugin sees while registering or unregistering. Capabilities registered through the
/// context are recorded as owned by that plugin.
pub struct PluginContext<'a> {
    pub document: &'a mut Document,
    registry: &'a mut CapabilityRegistry,
    owner: &'a str,
}

impl<'a> PluginContext<'a> {
    pub fn new(document: &'a mut Document, registry: &'a mut CapabilityRegistry, owner: &'a str) -> Self {
        Self { document, registry, owner }
    }

    pub fn owner(&self) -> &str {
        self.owner
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        self.registry
    }

    /// Declares a document-scoped property group. Values already stored in the document are kept.
    pub fn register_property_group(&mut self, def: PropertyGroupDef) -> Result<()> {
        self.document.properties.ensure_group(&def);
        self.registry.insert_property_group(self.owner, def)
    }

    pub fn register_operator(&mut self, operator: Box<dyn Operator>) -> Result<()> {
        self.registry.insert_operator(self.owner, operator)
    }

    pub fn register_panel(&mut self, panel: Box<dyn Panel>) -> Result<()> {
        self.registry.insert_panel(self.owner, panel)
    }

    pub fn unregister(&mut self, capability: &Capability) -> Result<()> {
        self.registry.remove(self.owner, capability)
    }
}

pub trait EditorPlugin: Any {
    fn name(&self) -> &'static str;

    fn register(&mut self, ctx: &mut PluginContext<'_>) -> Result<()>;

    fn unregister(&mut self, _ctx: &mut PluginContext<'_>) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub struct PluginSummary<'a> {
    pub name: &'a str,
    pub capabilities: Vec<Capability>,
    pub dynamic: bool,
}

// Field order matters: the plugin must drop before the library that holds its code.
struct PluginSlot {
    name: String,
    plugin: Box<dyn EditorPlugin>,
    origin: PluginOrigin,
}

enum PluginOrigin {
    BuiltIn,
    Dynamic(Library),
}

impl PluginOrigin {
    fn library(&self) -> Option<&Library> {
        match self {
            Self::Dynamic(lib) => Some(lib),
            Self::BuiltIn => None,
        }
    }
}

#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<PluginSlot>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        plugin: Box<dyn EditorPlugin>,
        document: &mut Document,
        registry: &mut CapabilityRegistry,
    ) -> Result<()> {
        self.insert_plugin(plugin, PluginOrigin::BuiltIn, document, registry)
    }

    pub fn load_from_manifest<P: AsRef<Path>>(
        &mut self,
        path: P,
        document: &mut Document,
        registry: &mut CapabilityRegistry,
    ) -> Result<Vec<String>> {
        let manifest_path = path.as_ref();
        let Some(manifest) = PluginManifest::from_path(manifest_path)? else {
            return Ok(Vec::new());
        };
        let manifest_dir =
            manifest_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        let mut loaded_names = Vec::new();
        for entry in manifest.plugins {
            if !entry.enabled {
                continue;
            }
            match self.load_entry(&entry, &manifest_dir, document, registry) {
                Ok(name) => loaded_names.push(name),
                Err(err) => eprintln!("[plugin:{}] failed to load: {err:?}", entry.name),
            }
        }
        Ok(loaded_names)
    }

    /// Runs the plugin's `unregister` hook, drops whatever it left registered and unloads it.
    pub fn unregister(
        &mut self,
        name: &str,
        document: &mut Document,
        registry: &mut CapabilityRegistry,
    ) -> Result<()> {
        let index = self
            .plugins
            .iter()
            .position(|slot| slot.name == name)
            .ok_or_else(|| anyhow!("plugin '{name}' is not registered"))?;
        let mut slot = self.plugins.remove(index);
        let result = {
            let mut ctx = PluginContext::new(document, registry, &slot.name);
            slot.plugin.unregister(&mut ctx)
        };
        registry.remove_all_owned(&slot.name);
        drop(slot);
        result.with_context(|| format!("unregistering plugin '{name}'"))
    }

    /// Unregisters every plugin, most recently registered first.
    pub fn shutdown(&mut self, document: &mut Document, registry: &mut CapabilityRegistry) {
        while let Some(name) = self.plugins.last().map(|slot| slot.name.clone()) {
            if let Err(err) = self.unregister(&name, document, registry) {
                eprintln!("[plugin:{name}] unregister failed: {err:?}");
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|slot| slot.name == name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn get<T: EditorPlugin + 'static>(&self) -> Option<&T> {
        self.plugins.iter().find_map(|slot| slot.plugin.as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: EditorPlugin + 'static>(&mut self) -> Option<&mut T> {
        self.plugins.iter_mut().find_map(|slot| slot.plugin.as_any_mut().downcast_mut::<T>())
    }

    pub fn plugin_summaries<'a>(&'a self, registry: &CapabilityRegistry) -> Vec<PluginSummary<'a>> {
        self.plugins
            .iter()
            .map(|slot| PluginSummary {
                name: slot.name.as_str(),
                capabilities: registry.owned_by(&slot.name),
                dynamic: slot.origin.library().is_some(),
            })
            .collect()
    }

    fn insert_plugin(
        &mut self,
        mut plugin: Box<dyn EditorPlugin>,
        origin: PluginOrigin,
        document: &mut Document,
        registry: &mut CapabilityRegistry,
    ) -> Result<()> {
        let name = plugin.name().to_string();
        if self.contains(&name) {
            bail!("plugin '{name}' is already registered");
        }
        let result = {
            let mut ctx = PluginContext::new(document, registry, &name);
            plugin.register(&mut ctx)
        };
        if let Err(err) = result {
            registry.remove_all_owned(&name);
            return Err(err.context(format!("registering plugin '{name}'")));
        }
        self.plugins.push(PluginSlot { name, plugin, origin });
        Ok(())
    }

    fn load_entry(
        &mut self,
        entry: &PluginManifestEntry,
        manifest_dir: &Path,
        document: &mut Document,
        registry: &mut CapabilityRegistry,
    ) -> Result<String> {
        if let Some(min_api) = entry.min_api {
            if EDITOR_PLUGIN_API_VERSION < min_api {
                bail!("requires plugin API {min_api}, current version is {EDITOR_PLUGIN_API_VERSION}");
            }
        }

        let plugin_path = if Path::new(&entry.path).is_absolute() {
            PathBuf::from(&entry.path)
        } else {
            manifest_dir.join(&entry.path)
        };

        let library = unsafe {
            Library::new(&plugin_path)
                .with_context(|| format!("loading plugin library '{}'", plugin_path.display()))?
        };

        let entry_fn = unsafe {
            library.get::<PluginEntryFn>(PLUGIN_ENTRY_SYMBOL).with_context(|| {
                format!(
                    "resolving '{symbol}' in plugin '{path}'",
                    symbol = "editor_plugin_entry",
                    path = plugin_path.display()
                )
            })?
        };

        let export = unsafe { entry_fn() };
        drop(entry_fn);

        if export.api_version != EDITOR_PLUGIN_API_VERSION {
            bail!(
                "api mismatch: plugin targets v{}, host exports v{}",
                export.api_version,
                EDITOR_PLUGIN_API_VERSION
            );
        }

        let handle = unsafe { (export.create)() };
        if handle.is_null() {
            bail!("plugin '{}' returned a null pointer", entry.name);
        }
        let plugin = unsafe { handle.into_box() };
        let name = plugin.name().to_string();

        self.insert_plugin(plugin, PluginOrigin::Dynamic(library), document, registry)?;
        Ok(name)
    }
}

#[derive(Debug, Deserialize)]
struct PluginManifest {
    #[serde(default)]
    plugins: Vec<PluginManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct PluginManifestEntry {
    name: String,
    path: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    min_api: Option<u32>,
}

impl PluginManifest {
    fn from_path(path: &Path) -> Result<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let manifest = serde_json::from_str(&contents)
                    .with_context(|| format!("parsing plugin manifest '{}'", path.display()))?;
                Ok(Some(manifest))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(anyhow!(err).context(format!("reading plugin manifest '{}'", path.display()))),
        }
    }
}

fn default_enabled() -> bool {
    true
}
