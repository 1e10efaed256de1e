//! Translator variant model.
//!
//! A closed set of output translators, one per target format. Each variant
//! owns a disjoint set of typed settings fields plus the shared file-output
//! category (target extension, file name suffix, template file name,
//! subdirectory renaming). Every field is mirrored 1:1 into a `<parameter
//! name=".." value=".."/>` element of the persisted configuration document;
//! the parameter table is generated from the typed fields, so the two can
//! never disagree.
//!
//! Setters are no-ops for unchanged values. A changed write recomputes the
//! field's dirty bit against the baseline captured at the last load/save,
//! runs the field's validity rule if it has one, and returns the
//! [`FieldEvent`]s it fired.

pub mod tracking;

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::models::{
    AcadFormat, AcadVersion, DocumentHandle, ExportOptions, ExportService, ImageFormat, JtVersion,
    ModuleFlags, PageRef, StepProtocol,
};
use camino::Utf8Path;

pub use tracking::{
    is_valid_file_name, FieldEvent, FieldTracker, ValidationMessages, FORBIDDEN_FILE_NAME_CHARS,
};

/// Matches `{placeholder}` tokens in template file names.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(.*?)\}").expect("invalid placeholder regex"));

/// The closed set of translator kinds. The discriminant doubles as the
/// `type` attribute of the persisted `<translator>` element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TranslatorKind {
    Document,
    Acad,
    Acis,
    Bitmap,
    Iges,
    Jt,
    Pdf,
    Step,
}

impl TranslatorKind {
    pub const ALL: [Self; 8] = [
        Self::Document,
        Self::Acad,
        Self::Acis,
        Self::Bitmap,
        Self::Iges,
        Self::Jt,
        Self::Pdf,
        Self::Step,
    ];

    pub fn index(self) -> u8 {
        match self {
            Self::Document => 0,
            Self::Acad => 1,
            Self::Acis => 2,
            Self::Bitmap => 3,
            Self::Iges => 4,
            Self::Jt => 5,
            Self::Pdf => 6,
            Self::Step => 7,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Document => "Document",
            Self::Acad => "Acad",
            Self::Acis => "Acis",
            Self::Bitmap => "Bitmap",
            Self::Iges => "Iges",
            Self::Jt => "Jt",
            Self::Pdf => "Pdf",
            Self::Step => "Step",
        }
    }

    pub fn default_extension(self) -> &'static str {
        match self {
            Self::Document => "GRB",
            Self::Acad => "DWG",
            Self::Acis => "SAT",
            Self::Bitmap => "BMP",
            Self::Iges => "IGS",
            Self::Jt => "JT",
            Self::Pdf => "PDF",
            Self::Step => "STP",
        }
    }

    /// The input-handling module this translator activates.
    pub fn module_flags(self) -> ModuleFlags {
        match self {
            Self::Document => ModuleFlags::DOCUMENT,
            Self::Acad | Self::Bitmap | Self::Pdf => ModuleFlags::DRAWING,
            Self::Acis | Self::Iges | Self::Jt | Self::Step => ModuleFlags::GEOMETRY,
        }
    }
}

/// Kind-specific settings fields.
#[derive(Clone, Debug, PartialEq)]
enum Payload {
    Document,
    Acad {
        format: AcadFormat,
        version: AcadVersion,
    },
    Acis {
        version: u32,
    },
    Bitmap {
        format: ImageFormat,
        screen_layers: bool,
        constructions: bool,
    },
    Iges {
        convert_analytic_geometry: bool,
    },
    Jt {
        version: JtVersion,
    },
    Pdf {
        single_document: bool,
    },
    Step {
        protocol: StepProtocol,
    },
}

impl Payload {
    fn new(kind: TranslatorKind) -> Self {
        match kind {
            TranslatorKind::Document => Self::Document,
            TranslatorKind::Acad => Self::Acad {
                format: AcadFormat::default(),
                version: AcadVersion::default(),
            },
            TranslatorKind::Acis => Self::Acis { version: 22 },
            TranslatorKind::Bitmap => Self::Bitmap {
                format: ImageFormat::default(),
                screen_layers: false,
                constructions: false,
            },
            TranslatorKind::Iges => Self::Iges {
                convert_analytic_geometry: false,
            },
            TranslatorKind::Jt => Self::Jt {
                version: JtVersion::default(),
            },
            TranslatorKind::Pdf => Self::Pdf {
                single_document: false,
            },
            TranslatorKind::Step => Self::Step {
                protocol: StepProtocol::default(),
            },
        }
    }
}

fn bool_param(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn parse_bool_param(value: &str) -> bool {
    value == "1"
}

/// One output translator with its typed settings, dirty tracking, and
/// validation state.
#[derive(Clone, Debug, PartialEq)]
pub struct Translator {
    kind: TranslatorKind,
    target_extension: String,
    file_name_suffix: String,
    template_file_name: String,
    rename_subdirectory: bool,
    payload: Payload,
    tracker: FieldTracker,
    messages: ValidationMessages,
}

impl Translator {
    pub fn new(kind: TranslatorKind) -> Self {
        Self::with_messages(kind, ValidationMessages::default())
    }

    /// Construct with embedder-supplied validation message templates.
    pub fn with_messages(kind: TranslatorKind, messages: ValidationMessages) -> Self {
        let mut translator = Self {
            kind,
            target_extension: kind.default_extension().to_string(),
            file_name_suffix: String::new(),
            template_file_name: String::new(),
            rename_subdirectory: false,
            payload: Payload::new(kind),
            tracker: FieldTracker::new(),
            messages,
        };
        let baseline = translator.parameters();
        translator.tracker.capture_baseline(&baseline);
        translator
    }

    pub fn kind(&self) -> TranslatorKind {
        self.kind
    }

    pub fn is_changed(&self) -> bool {
        self.tracker.is_changed()
    }

    pub fn is_field_dirty(&self, name: &str) -> bool {
        self.tracker.is_field_dirty(name)
    }

    pub fn has_errors(&self) -> bool {
        self.tracker.has_errors()
    }

    pub fn errors_for(&self, name: &str) -> &[String] {
        self.tracker.errors_for(name)
    }

    pub fn clear_errors(&mut self) {
        self.tracker.clear_errors();
    }

    /// Re-snapshot the current values as the clean baseline. Called by the
    /// owning record after a successful load or save.
    pub fn capture_baseline(&mut self) {
        let baseline = self.parameters();
        self.tracker.capture_baseline(&baseline);
    }

    // --- shared file-output fields ---------------------------------------

    pub fn target_extension(&self) -> &str {
        &self.target_extension
    }

    pub fn file_name_suffix(&self) -> &str {
        &self.file_name_suffix
    }

    pub fn template_file_name(&self) -> &str {
        &self.template_file_name
    }

    pub fn rename_subdirectory(&self) -> bool {
        self.rename_subdirectory
    }

    pub fn set_target_extension(&mut self, value: &str) -> Vec<FieldEvent> {
        if self.target_extension == value {
            return Vec::new();
        }
        self.target_extension = value.to_string();
        self.tracker.record_write("TargetExtension", value);
        vec![FieldEvent::PropertyChanged("TargetExtension")]
    }

    pub fn set_file_name_suffix(&mut self, value: &str) -> Vec<FieldEvent> {
        if self.file_name_suffix == value {
            return Vec::new();
        }
        self.file_name_suffix = value.to_string();
        self.tracker.record_write("FileNameSuffix", value);
        let mut events = self.validate_name_field("FileNameSuffix", value);
        events.push(FieldEvent::PropertyChanged("FileNameSuffix"));
        events
    }

    pub fn set_template_file_name(&mut self, value: &str) -> Vec<FieldEvent> {
        if self.template_file_name == value {
            return Vec::new();
        }
        self.template_file_name = value.to_string();
        self.tracker.record_write("TemplateFileName", value);
        // placeholders are legal; validate the literal remainder only
        let literal = PLACEHOLDER_RE.replace_all(value, "");
        let mut events = self.validate_name_field("TemplateFileName", &literal);
        events.push(FieldEvent::PropertyChanged("TemplateFileName"));
        events
    }

    pub fn set_rename_subdirectory(&mut self, value: bool) -> Vec<FieldEvent> {
        if self.rename_subdirectory == value {
            return Vec::new();
        }
        self.rename_subdirectory = value;
        self.tracker
            .record_write("RenameSubdirectory", &bool_param(value));
        vec![FieldEvent::PropertyChanged("RenameSubdirectory")]
    }

    fn validate_name_field(&mut self, name: &'static str, value: &str) -> Vec<FieldEvent> {
        let error = self.messages.forbidden_chars_error();
        let changed = if is_valid_file_name(value) {
            self.tracker.remove_error(name, &error)
        } else {
            self.tracker.add_error(name, error)
        };
        if changed {
            vec![FieldEvent::ErrorsChanged(name)]
        } else {
            Vec::new()
        }
    }

    // --- kind-specific fields ---------------------------------------------

    pub fn set_acad_format(&mut self, value: AcadFormat) -> Vec<FieldEvent> {
        match &mut self.payload {
            Payload::Acad { format, .. } => {
                if *format == value {
                    return Vec::new();
                }
                *format = value;
            }
            _ => return self.reject_write("FileFormat"),
        }
        self.tracker.record_write("FileFormat", value.as_param());
        let mut events = vec![FieldEvent::PropertyChanged("FileFormat")];
        // the target extension mirrors the selected drawing format
        events.extend(self.set_target_extension(value.as_param()));
        events
    }

    pub fn set_acad_version(&mut self, value: AcadVersion) -> Vec<FieldEvent> {
        match &mut self.payload {
            Payload::Acad { version, .. } => {
                if *version == value {
                    return Vec::new();
                }
                *version = value;
            }
            _ => return self.reject_write("AcadVersion"),
        }
        self.tracker.record_write("AcadVersion", value.as_param());
        vec![FieldEvent::PropertyChanged("AcadVersion")]
    }

    pub fn set_acis_version(&mut self, value: u32) -> Vec<FieldEvent> {
        match &mut self.payload {
            Payload::Acis { version } => {
                if *version == value {
                    return Vec::new();
                }
                *version = value;
            }
            _ => return self.reject_write("FormatVersion"),
        }
        self.tracker.record_write("FormatVersion", &value.to_string());
        vec![FieldEvent::PropertyChanged("FormatVersion")]
    }

    pub fn set_image_format(&mut self, value: ImageFormat) -> Vec<FieldEvent> {
        match &mut self.payload {
            Payload::Bitmap { format, .. } => {
                if *format == value {
                    return Vec::new();
                }
                *format = value;
            }
            _ => return self.reject_write("ImageFormat"),
        }
        self.tracker.record_write("ImageFormat", value.as_param());
        let mut events = vec![FieldEvent::PropertyChanged("ImageFormat")];
        events.extend(self.set_target_extension(value.as_param()));
        events
    }

    pub fn set_screen_layers(&mut self, value: bool) -> Vec<FieldEvent> {
        match &mut self.payload {
            Payload::Bitmap { screen_layers, .. } => {
                if *screen_layers == value {
                    return Vec::new();
                }
                *screen_layers = value;
            }
            _ => return self.reject_write("ScreenLayers"),
        }
        self.tracker.record_write("ScreenLayers", &bool_param(value));
        vec![FieldEvent::PropertyChanged("ScreenLayers")]
    }

    pub fn set_constructions(&mut self, value: bool) -> Vec<FieldEvent> {
        match &mut self.payload {
            Payload::Bitmap { constructions, .. } => {
                if *constructions == value {
                    return Vec::new();
                }
                *constructions = value;
            }
            _ => return self.reject_write("Constructions"),
        }
        self.tracker
            .record_write("Constructions", &bool_param(value));
        vec![FieldEvent::PropertyChanged("Constructions")]
    }

    pub fn set_convert_analytic_geometry(&mut self, value: bool) -> Vec<FieldEvent> {
        match &mut self.payload {
            Payload::Iges {
                convert_analytic_geometry,
            } => {
                if *convert_analytic_geometry == value {
                    return Vec::new();
                }
                *convert_analytic_geometry = value;
            }
            _ => return self.reject_write("ConvertAnalyticGeometry"),
        }
        self.tracker
            .record_write("ConvertAnalyticGeometry", &bool_param(value));
        vec![FieldEvent::PropertyChanged("ConvertAnalyticGeometry")]
    }

    pub fn set_jt_version(&mut self, value: JtVersion) -> Vec<FieldEvent> {
        match &mut self.payload {
            Payload::Jt { version } => {
                if *version == value {
                    return Vec::new();
                }
                *version = value;
            }
            _ => return self.reject_write("JtVersion"),
        }
        self.tracker.record_write("JtVersion", value.as_param());
        vec![FieldEvent::PropertyChanged("JtVersion")]
    }

    pub fn set_single_document(&mut self, value: bool) -> Vec<FieldEvent> {
        match &mut self.payload {
            Payload::Pdf { single_document } => {
                if *single_document == value {
                    return Vec::new();
                }
                *single_document = value;
            }
            _ => return self.reject_write("SingleDocument"),
        }
        self.tracker
            .record_write("SingleDocument", &bool_param(value));
        vec![FieldEvent::PropertyChanged("SingleDocument")]
    }

    pub fn set_step_protocol(&mut self, value: StepProtocol) -> Vec<FieldEvent> {
        match &mut self.payload {
            Payload::Step { protocol } => {
                if *protocol == value {
                    return Vec::new();
                }
                *protocol = value;
            }
            _ => return self.reject_write("Protocol"),
        }
        self.tracker.record_write("Protocol", value.as_param());
        vec![FieldEvent::PropertyChanged("Protocol")]
    }

    fn reject_write(&self, field: &str) -> Vec<FieldEvent> {
        warn!(
            "ignoring write to {} on a {} translator",
            field,
            self.kind.label()
        );
        Vec::new()
    }

    // --- serialization ----------------------------------------------------

    /// The parameter table in declared order, as persisted inside the
    /// `<translator>` element.
    pub fn parameters(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("TargetExtension", self.target_extension.clone()),
            ("FileNameSuffix", self.file_name_suffix.clone()),
            ("TemplateFileName", self.template_file_name.clone()),
            ("RenameSubdirectory", bool_param(self.rename_subdirectory)),
        ];
        match &self.payload {
            Payload::Document => {}
            Payload::Acad { format, version } => {
                params.push(("FileFormat", format.as_param().to_string()));
                params.push(("AcadVersion", version.as_param().to_string()));
            }
            Payload::Acis { version } => {
                params.push(("FormatVersion", version.to_string()));
            }
            Payload::Bitmap {
                format,
                screen_layers,
                constructions,
            } => {
                params.push(("ImageFormat", format.as_param().to_string()));
                params.push(("ScreenLayers", bool_param(*screen_layers)));
                params.push(("Constructions", bool_param(*constructions)));
            }
            Payload::Iges {
                convert_analytic_geometry,
            } => {
                params.push((
                    "ConvertAnalyticGeometry",
                    bool_param(*convert_analytic_geometry),
                ));
            }
            Payload::Jt { version } => {
                params.push(("JtVersion", version.as_param().to_string()));
            }
            Payload::Pdf { single_document } => {
                params.push(("SingleDocument", bool_param(*single_document)));
            }
            Payload::Step { protocol } => {
                params.push(("Protocol", protocol.as_param().to_string()));
            }
        }
        params
    }

    /// Apply one persisted parameter by name. Order-independent; unknown
    /// names and unparseable values leave the field at its current value.
    /// Hydration only — no dirty tracking, no validation.
    pub fn apply_parameter(&mut self, name: &str, value: &str) {
        match name {
            "TargetExtension" => self.target_extension = value.to_string(),
            "FileNameSuffix" => self.file_name_suffix = value.to_string(),
            "TemplateFileName" => self.template_file_name = value.to_string(),
            "RenameSubdirectory" => self.rename_subdirectory = parse_bool_param(value),
            _ => self.apply_payload_parameter(name, value),
        }
    }

    fn apply_payload_parameter(&mut self, name: &str, value: &str) {
        match (&mut self.payload, name) {
            (Payload::Acad { format, .. }, "FileFormat") => {
                if let Some(parsed) = AcadFormat::from_param(value) {
                    *format = parsed;
                }
            }
            (Payload::Acad { version, .. }, "AcadVersion") => {
                if let Some(parsed) = AcadVersion::from_param(value) {
                    *version = parsed;
                }
            }
            (Payload::Acis { version }, "FormatVersion") => {
                if let Ok(parsed) = value.parse() {
                    *version = parsed;
                }
            }
            (Payload::Bitmap { format, .. }, "ImageFormat") => {
                if let Some(parsed) = ImageFormat::from_param(value) {
                    *format = parsed;
                }
            }
            (Payload::Bitmap { screen_layers, .. }, "ScreenLayers") => {
                *screen_layers = parse_bool_param(value);
            }
            (Payload::Bitmap { constructions, .. }, "Constructions") => {
                *constructions = parse_bool_param(value);
            }
            (
                Payload::Iges {
                    convert_analytic_geometry,
                },
                "ConvertAnalyticGeometry",
            ) => {
                *convert_analytic_geometry = parse_bool_param(value);
            }
            (Payload::Jt { version }, "JtVersion") => {
                if let Some(parsed) = JtVersion::from_param(value) {
                    *version = parsed;
                }
            }
            (Payload::Pdf { single_document }, "SingleDocument") => {
                *single_document = parse_bool_param(value);
            }
            (Payload::Step { protocol }, "Protocol") => {
                if let Some(parsed) = StepProtocol::from_param(value) {
                    *protocol = parsed;
                }
            }
            _ => warn!(
                "unknown parameter {} for {} translator",
                name,
                self.kind.label()
            ),
        }
    }

    /// Hydrate from a persisted parameter list and capture the result as the
    /// clean baseline.
    pub fn hydrate(&mut self, parameters: &[(String, String)]) {
        for (name, value) in parameters {
            self.apply_parameter(name, value);
        }
        self.capture_baseline();
    }

    // --- export -----------------------------------------------------------

    /// Build the format-specific options structure from current fields.
    pub fn export_options(&self, page: &PageRef) -> ExportOptions {
        match &self.payload {
            Payload::Document => ExportOptions::Document,
            Payload::Acad { format, version } => ExportOptions::Acad {
                format: *format,
                version: *version,
            },
            Payload::Acis { version } => ExportOptions::Acis { version: *version },
            Payload::Bitmap {
                format,
                screen_layers,
                constructions,
            } => ExportOptions::Bitmap {
                format: *format,
                screen_layers: *screen_layers,
                constructions: *constructions,
                width: page.width_px(),
                height: page.height_px(),
            },
            Payload::Iges {
                convert_analytic_geometry,
            } => ExportOptions::Iges {
                convert_analytic_geometry: *convert_analytic_geometry,
            },
            Payload::Jt { version } => ExportOptions::Jt { version: *version },
            Payload::Pdf { single_document } => ExportOptions::Pdf {
                single_document: *single_document,
            },
            Payload::Step { protocol } => ExportOptions::Step {
                protocol: *protocol,
            },
        }
    }

    /// Export one document through the external service. Failures are
    /// reported to the caller and logged, never raised.
    pub fn export(
        &self,
        document: &DocumentHandle,
        page: &PageRef,
        output_path: &Utf8Path,
        service: &dyn ExportService,
    ) -> bool {
        let options = self.export_options(page);
        let ok = service.export(document, page, output_path, &options);
        if ok {
            tracing::info!("exported {} -> {}", document.path, output_path);
        } else {
            tracing::warn!(
                "{} export declined for {}",
                self.kind.label(),
                document.path
            );
        }
        ok
    }

    /// Output file name for a source document stem, applying the template
    /// (with `{name}` substituted) and the suffix.
    pub fn output_file_name(&self, stem: &str) -> String {
        let base = if self.template_file_name.is_empty() {
            stem.to_string()
        } else {
            let filled = self.template_file_name.replace("{name}", stem);
            PLACEHOLDER_RE.replace_all(&filled, "").into_owned()
        };
        format!(
            "{base}{}.{}",
            self.file_name_suffix,
            self.target_extension.to_lowercase()
        )
    }
}
