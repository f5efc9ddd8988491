//! Vulkan instance creation and diagnostic layer probing.

use crate::error::{GpuError, Result};
use ash::ext::debug_utils;
use ash::vk;
use std::borrow::Cow;
use std::ffi::{CStr, CString};

/// Required instance extensions for the engine.
pub fn required_instance_extensions() -> Vec<&'static CStr> {
    let extensions = vec![
        ash::khr::surface::NAME,
        #[cfg(target_os = "windows")]
        ash::khr::win32_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::xlib_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::wayland_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::ext::metal_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::khr::portability_enumeration::NAME,
    ];

    extensions
}

/// Diagnostic layer sets in priority order. Newer drivers ship the
/// unified KHRONOS layer; older ones only know the LUNARG meta layer or
/// the individual legacy layers it bundled.
const LAYER_SETS: [&[&CStr]; 3] = [
    &[c"VK_LAYER_KHRONOS_validation"],
    &[c"VK_LAYER_LUNARG_standard_validation"],
    &[
        c"VK_LAYER_GOOGLE_threading",
        c"VK_LAYER_LUNARG_parameter_validation",
        c"VK_LAYER_LUNARG_object_tracker",
        c"VK_LAYER_LUNARG_core_validation",
        c"VK_LAYER_GOOGLE_unique_objects",
    ],
];

/// Pick the first layer set whose members are all present in `available`.
#[must_use]
pub fn choose_layer_set(available: &[&CStr]) -> Option<&'static [&'static CStr]> {
    LAYER_SETS
        .iter()
        .copied()
        .find(|set| set.iter().all(|layer| available.contains(layer)))
}

/// Create a Vulkan instance.
///
/// Returns the instance and whether diagnostic layers were enabled.
/// Requested-but-unavailable diagnostics downgrade to none with a
/// warning; they are never a startup failure.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    app_name: &str,
    app_version: (u32, u32, u32),
    enable_diagnostics: bool,
) -> Result<(ash::Instance, bool)> {
    let app_name =
        CString::new(app_name).map_err(|e| GpuError::InstanceCreation(e.to_string()))?;

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(
            0,
            app_version.0,
            app_version.1,
            app_version.2,
        ))
        .engine_name(c"Keel")
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_1);

    // Resolve the diagnostic layer set against what the loader reports
    let available_layers = entry.enumerate_instance_layer_properties()?;
    let available: Vec<&CStr> = available_layers
        .iter()
        .map(|props| CStr::from_ptr(props.layer_name.as_ptr()))
        .collect();

    let layers: &[&CStr] = if enable_diagnostics {
        match choose_layer_set(&available) {
            Some(set) => set,
            None => {
                tracing::warn!("no diagnostic layer set available, continuing without layers");
                &[]
            }
        }
    } else {
        &[]
    };
    let diagnostics_active = !layers.is_empty();

    let mut extensions = required_instance_extensions();
    if diagnostics_active {
        extensions.push(debug_utils::NAME);
    }

    let extension_names: Vec<*const i8> = extensions.iter().map(|ext| ext.as_ptr()).collect();
    let layer_names: Vec<*const i8> = layers.iter().map(|l| l.as_ptr()).collect();

    // Required for MoltenVK on macOS
    #[cfg(target_os = "macos")]
    let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    #[cfg(not(target_os = "macos"))]
    let create_flags = vk::InstanceCreateFlags::empty();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(create_flags);

    let instance = entry.create_instance(&create_info, None)?;

    Ok((instance, diagnostics_active))
}

/// Debug-utils messenger forwarding driver messages into `tracing`.
///
/// Informational only: messages never influence control flow.
pub struct DebugMessenger {
    loader: debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// Install a messenger for warnings and errors.
    ///
    /// # Safety
    /// The instance must be valid and have been created with the
    /// debug-utils extension enabled.
    pub unsafe fn install(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        let loader = debug_utils::Instance::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = loader.create_debug_utils_messenger(&create_info, None)?;

        Ok(Self { loader, messenger })
    }

    /// Destroy the messenger.
    ///
    /// # Safety
    /// Must be called before the instance is destroyed.
    pub unsafe fn destroy(&self) {
        self.loader
            .destroy_debug_utils_messenger(self.messenger, None);
    }
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = if callback_data.is_null() || (*callback_data).p_message.is_null() {
        Cow::Borrowed("<no message>")
    } else {
        CStr::from_ptr((*callback_data).p_message).to_string_lossy()
    };

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        tracing::error!("vulkan {message_type:?}: {message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        tracing::warn!("vulkan {message_type:?}: {message}");
    } else {
        tracing::debug!("vulkan {message_type:?}: {message}");
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn khronos_layer_wins_when_present() {
        let available = [
            c"VK_LAYER_LUNARG_standard_validation",
            c"VK_LAYER_KHRONOS_validation",
        ];
        let set = choose_layer_set(&available).unwrap();
        assert_eq!(set, &[c"VK_LAYER_KHRONOS_validation"]);
    }

    #[test]
    fn falls_back_to_lunarg_meta_layer() {
        let available = [c"VK_LAYER_LUNARG_standard_validation", c"VK_LAYER_other"];
        let set = choose_layer_set(&available).unwrap();
        assert_eq!(set, &[c"VK_LAYER_LUNARG_standard_validation"]);
    }

    #[test]
    fn legacy_set_requires_every_member() {
        let complete = [
            c"VK_LAYER_GOOGLE_threading",
            c"VK_LAYER_LUNARG_parameter_validation",
            c"VK_LAYER_LUNARG_object_tracker",
            c"VK_LAYER_LUNARG_core_validation",
            c"VK_LAYER_GOOGLE_unique_objects",
        ];
        assert_eq!(choose_layer_set(&complete).unwrap().len(), 5);

        let partial = &complete[..4];
        assert!(choose_layer_set(partial).is_none());
    }

    #[test]
    fn no_layers_available_yields_none() {
        assert!(choose_layer_set(&[]).is_none());
    }
}
