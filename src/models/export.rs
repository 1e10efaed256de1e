// Export vocabulary shared between the translator variants and the external
// Document Export Service.

use camino::{Utf8Path, Utf8PathBuf};

/// Pixels per millimetre used when sizing raster output from page dimensions.
pub const PX_PER_MM: f64 = 3.779_527_559_055_1;

/// Opaque handle to a source CAD document.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentHandle {
    pub path: Utf8PathBuf,
}

impl DocumentHandle {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Page/target descriptor for a single export call.
#[derive(Clone, Debug, PartialEq)]
pub struct PageRef {
    pub name: String,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PageRef {
    /// Descriptor for a document's main page, sized A4 until the export
    /// service reports real page bounds.
    pub fn for_document(path: &Utf8Path) -> Self {
        Self {
            name: path.file_stem().unwrap_or("document").to_string(),
            width_mm: 210.0,
            height_mm: 297.0,
        }
    }

    pub fn width_px(&self) -> u32 {
        (self.width_mm * PX_PER_MM).round() as u32
    }

    pub fn height_px(&self) -> u32 {
        (self.height_mm * PX_PER_MM).round() as u32
    }
}

/// Drawing file formats for the CAD-2D translator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AcadFormat {
    #[default]
    Dwg,
    Dxf,
    Dxb,
}

impl AcadFormat {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Dwg => "DWG",
            Self::Dxf => "DXF",
            Self::Dxb => "DXB",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "DWG" => Some(Self::Dwg),
            "DXF" => Some(Self::Dxf),
            "DXB" => Some(Self::Dxb),
            _ => None,
        }
    }
}

/// Target AutoCAD file version for the CAD-2D translator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AcadVersion {
    V12,
    V2000,
    V2004,
    V2007,
    #[default]
    V2010,
}

impl AcadVersion {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::V12 => "12",
            Self::V2000 => "2000",
            Self::V2004 => "2004",
            Self::V2007 => "2007",
            Self::V2010 => "2010",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "12" => Some(Self::V12),
            "2000" => Some(Self::V2000),
            "2004" => Some(Self::V2004),
            "2007" => Some(Self::V2007),
            "2010" => Some(Self::V2010),
            _ => None,
        }
    }
}

/// Raster sub-formats for the image translator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageFormat {
    #[default]
    Bmp,
    Jpeg,
    Gif,
    Tiff,
    Png,
}

impl ImageFormat {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Bmp => "BMP",
            Self::Jpeg => "JPEG",
            Self::Gif => "GIF",
            Self::Tiff => "TIFF",
            Self::Png => "PNG",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "BMP" => Some(Self::Bmp),
            "JPEG" => Some(Self::Jpeg),
            "GIF" => Some(Self::Gif),
            "TIFF" => Some(Self::Tiff),
            "PNG" => Some(Self::Png),
            _ => None,
        }
    }
}

/// JT file versions supported by the JT translator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JtVersion {
    #[default]
    V8_0,
    V9_5,
}

impl JtVersion {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::V8_0 => "8.0",
            Self::V9_5 => "9.5",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "8.0" => Some(Self::V8_0),
            "9.5" => Some(Self::V9_5),
            _ => None,
        }
    }
}

/// Application protocols for STEP export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepProtocol {
    Ap203,
    #[default]
    Ap214,
    Ap242,
}

impl StepProtocol {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Ap203 => "AP203",
            Self::Ap214 => "AP214",
            Self::Ap242 => "AP242",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "AP203" => Some(Self::Ap203),
            "AP214" => Some(Self::Ap214),
            "AP242" => Some(Self::Ap242),
            _ => None,
        }
    }
}

/// Format-specific options handed to the Document Export Service, built from
/// a translator variant's current fields.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportOptions {
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
        width: u32,
        height: u32,
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

/// The external Document Export Service seam.
///
/// The core treats per-document conversion as an opaque capability: one call
/// per file per translator, success or failure, no retries.
pub trait ExportService: Send + Sync {
    fn export(
        &self,
        document: &DocumentHandle,
        page: &PageRef,
        output_path: &Utf8Path,
        options: &ExportOptions,
    ) -> bool;
}
