//! OFX string constants: APIs, suites, object types, contexts and
//! property names.

/// The image effect API name exported in `OfxPlugin::pluginApi`.
pub const IMAGE_EFFECT_PLUGIN_API: &str = "OfxImageEffectPluginAPI";
/// The image effect API version this host implements.
pub const IMAGE_EFFECT_PLUGIN_API_VERSION: i32 = 1;

/// Suite names served by `fetchSuite`.
pub mod suites {
    /// Property suite.
    pub const PROPERTY: &str = "OfxPropertySuite";
    /// Image effect suite.
    pub const IMAGE_EFFECT: &str = "OfxImageEffectSuite";
    /// Parameter suite.
    pub const PARAMETER: &str = "OfxParameterSuite";
}

/// Values of `OfxPropType`.
pub mod types {
    pub const IMAGE_EFFECT_HOST: &str = "OfxTypeImageEffectHost";
    pub const IMAGE_EFFECT: &str = "OfxTypeImageEffect";
    pub const IMAGE_EFFECT_INSTANCE: &str = "OfxTypeImageEffectInstance";
    pub const CLIP: &str = "OfxTypeClip";
    pub const PARAMETER: &str = "OfxTypeParameter";
    pub const PARAMETER_SET: &str = "OfxTypeParameterSet";
}

/// Image effect contexts.
pub mod contexts {
    pub const GENERATOR: &str = "OfxImageEffectContextGenerator";
    pub const FILTER: &str = "OfxImageEffectContextFilter";
    pub const TRANSITION: &str = "OfxImageEffectContextTransition";
    pub const PAINT: &str = "OfxImageEffectContextPaint";
    pub const GENERAL: &str = "OfxImageEffectContextGeneral";
    pub const RETIMER: &str = "OfxImageEffectContextRetimer";

    /// Every context the API defines.
    pub const ALL: &[&str] = &[GENERATOR, FILTER, TRANSITION, PAINT, GENERAL, RETIMER];

    /// Whether `context` is one of the defined contexts.
    pub fn is_known(context: &str) -> bool {
        ALL.contains(&context)
    }
}

/// Reasons passed with instance-changed actions.
pub mod change_reasons {
    pub const USER_EDITED: &str = "OfxChangeUserEdited";
    pub const PLUGIN_EDITED: &str = "OfxChangePluginEdited";
    pub const TIME: &str = "OfxChangeTime";
}

/// Render thread safety values.
pub mod thread_safety {
    pub const UNSAFE: &str = "OfxImageEffectRenderUnsafe";
    pub const INSTANCE_SAFE: &str = "OfxImageEffectRenderInstanceSafe";
    pub const FULLY_SAFE: &str = "OfxImageEffectRenderFullySafe";
}

/// Parameter type names accepted by `paramDefine`.
pub mod param_types {
    pub const INTEGER: &str = "OfxParamTypeInteger";
    pub const DOUBLE: &str = "OfxParamTypeDouble";
    pub const BOOLEAN: &str = "OfxParamTypeBoolean";
    pub const CHOICE: &str = "OfxParamTypeChoice";
    pub const RGBA: &str = "OfxParamTypeRGBA";
    pub const RGB: &str = "OfxParamTypeRGB";
    pub const DOUBLE_2D: &str = "OfxParamTypeDouble2D";
    pub const INTEGER_2D: &str = "OfxParamTypeInteger2D";
    pub const DOUBLE_3D: &str = "OfxParamTypeDouble3D";
    pub const INTEGER_3D: &str = "OfxParamTypeInteger3D";
    pub const STRING: &str = "OfxParamTypeString";
    pub const CUSTOM: &str = "OfxParamTypeCustom";
    pub const GROUP: &str = "OfxParamTypeGroup";
    pub const PAGE: &str = "OfxParamTypePage";
    pub const PUSH_BUTTON: &str = "OfxParamTypePushButton";
}

/// Property names.
pub mod props {
    // Generic
    pub const TYPE: &str = "OfxPropType";
    pub const NAME: &str = "OfxPropName";
    pub const LABEL: &str = "OfxPropLabel";
    pub const SHORT_LABEL: &str = "OfxPropShortLabel";
    pub const LONG_LABEL: &str = "OfxPropLongLabel";
    pub const VERSION: &str = "OfxPropVersion";
    pub const VERSION_LABEL: &str = "OfxPropVersionLabel";
    pub const API_VERSION: &str = "OfxPropAPIVersion";
    pub const PLUGIN_DESCRIPTION: &str = "OfxPropPluginDescription";
    pub const PLUGIN_FILE_PATH: &str = "OfxPluginPropFilePath";
    pub const CHANGE_REASON: &str = "OfxPropChangeReason";
    pub const TIME: &str = "OfxPropTime";
    pub const IS_INTERACTIVE: &str = "OfxPropIsInteractive";
    pub const INSTANCE_DATA: &str = "OfxPropInstanceData";

    // Host
    pub const HOST_IS_BACKGROUND: &str = "OfxImageEffectHostPropIsBackground";
    pub const SUPPORTS_OVERLAYS: &str = "OfxImageEffectPropSupportsOverlays";
    pub const SUPPORTS_MULTIPLE_CLIP_PARS: &str = "OfxImageEffectPropSupportsMultipleClipPARs";
    pub const SUPPORTED_COMPONENTS: &str = "OfxImageEffectPropSupportedComponents";
    pub const SUPPORTS_CUSTOM_ANIMATION: &str = "OfxParamHostPropSupportsCustomAnimation";
    pub const MAX_PARAMETERS: &str = "OfxParamHostPropMaxParameters";
    pub const MAX_PAGES: &str = "OfxParamHostPropMaxPages";

    // Image effect descriptor
    pub const SUPPORTED_CONTEXTS: &str = "OfxImageEffectPropSupportedContexts";
    pub const GROUPING: &str = "OfxImageEffectPluginPropGrouping";
    pub const SINGLE_INSTANCE: &str = "OfxImageEffectPluginPropSingleInstance";
    pub const RENDER_THREAD_SAFETY: &str = "OfxImageEffectPluginRenderThreadSafety";
    pub const HOST_FRAME_THREADING: &str = "OfxImageEffectPluginPropHostFrameThreading";
    pub const SUPPORTS_MULTI_RESOLUTION: &str = "OfxImageEffectPropSupportsMultiResolution";
    pub const SUPPORTS_TILES: &str = "OfxImageEffectPropSupportsTiles";
    pub const TEMPORAL_CLIP_ACCESS: &str = "OfxImageEffectPropTemporalClipAccess";
    pub const SUPPORTED_PIXEL_DEPTHS: &str = "OfxImageEffectPropSupportedPixelDepths";
    pub const SUPPORTS_MULTIPLE_CLIP_DEPTHS: &str = "OfxImageEffectPropSupportsMultipleClipDepths";
    pub const FIELD_RENDER_TWICE_ALWAYS: &str = "OfxImageEffectPluginPropFieldRenderTwiceAlways";
    pub const CLIP_PREFERENCES_SLAVE_PARAM: &str = "OfxImageEffectPropClipPreferencesSlaveParam";
    pub const CONTEXT: &str = "OfxImageEffectPropContext";

    // Instance
    pub const PROJECT_SIZE: &str = "OfxImageEffectPropProjectSize";
    pub const PROJECT_OFFSET: &str = "OfxImageEffectPropProjectOffset";
    pub const PROJECT_EXTENT: &str = "OfxImageEffectPropProjectExtent";
    pub const PROJECT_PIXEL_ASPECT_RATIO: &str = "OfxImageEffectPropProjectPixelAspectRatio";
    pub const FRAME_RATE: &str = "OfxImageEffectPropFrameRate";
    pub const INSTANCE_EFFECT_DURATION: &str = "OfxImageEffectInstancePropEffectDuration";
    pub const SEQUENTIAL_RENDER: &str = "OfxImageEffectInstancePropSequentialRender";

    // Render arguments
    pub const FRAME_RANGE: &str = "OfxImageEffectPropFrameRange";
    pub const FRAME_STEP: &str = "OfxImageEffectPropFrameStep";
    pub const RENDER_SCALE: &str = "OfxImageEffectPropRenderScale";
    pub const FIELD_TO_RENDER: &str = "OfxImageEffectPropFieldToRender";
    pub const RENDER_WINDOW: &str = "OfxImageEffectPropRenderWindow";
    pub const SEQUENTIAL_RENDER_STATUS: &str = "OfxImageEffectPropSequentialRenderStatus";
    pub const INTERACTIVE_RENDER_STATUS: &str = "OfxImageEffectPropInteractiveRenderStatus";
    pub const RENDER_QUALITY_DRAFT: &str = "OfxImageEffectPropRenderQualityDraft";

    // Clips
    pub const CLIP_OPTIONAL: &str = "OfxImageClipPropOptional";
    pub const CLIP_IS_MASK: &str = "OfxImageClipPropIsMask";
    pub const CLIP_FIELD_EXTRACTION: &str = "OfxImageClipPropFieldExtraction";

    // Parameters
    pub const PARAM_TYPE: &str = "OfxParamPropType";
    pub const PARAM_SECRET: &str = "OfxParamPropSecret";
    pub const PARAM_HINT: &str = "OfxParamPropHint";
    pub const PARAM_SCRIPT_NAME: &str = "OfxParamPropScriptName";
    pub const PARAM_PARENT: &str = "OfxParamPropParent";
    pub const PARAM_ENABLED: &str = "OfxParamPropEnabled";
    pub const PARAM_ANIMATES: &str = "OfxParamPropAnimates";
    pub const PARAM_DEFAULT: &str = "OfxParamPropDefault";
    pub const PARAM_CHOICE_OPTION: &str = "OfxParamPropChoiceOption";
}
