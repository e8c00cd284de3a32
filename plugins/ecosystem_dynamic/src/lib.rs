use ecosystem_importer::config::{ImporterConfig, DEFAULT_CONFIG_PATH};
use ecosystem_importer::plugins::{EditorPlugin, PluginExport, PluginHandle, EDITOR_PLUGIN_API_VERSION};
use ecosystem_importer::EcosystemPlugin;

unsafe extern "C" fn create_plugin() -> PluginHandle {
    let config = ImporterConfig::load_or_default(DEFAULT_CONFIG_PATH);
    let plugin: Box<dyn EditorPlugin> = Box::new(EcosystemPlugin::new(config));
    PluginHandle::from_box(plugin)
}

#[no_mangle]
pub extern "C" fn editor_plugin_entry() -> PluginExport {
    PluginExport { api_version: EDITOR_PLUGIN_API_VERSION, create: create_plugin }
}
