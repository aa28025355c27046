use std::fmt;

/// Shape of the artifact a mode produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Spreadsheet,
    Archive,
    Document,
}

impl OutputKind {
    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Spreadsheet => "xlsx",
            OutputKind::Archive => "zip",
            OutputKind::Document => "pdf",
        }
    }

    /// Content type assumed when the server does not send one.
    pub fn default_content_type(self) -> &'static str {
        match self {
            OutputKind::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            OutputKind::Archive => "application/zip",
            OutputKind::Document => "application/pdf",
        }
    }
}

/// Conversion variant; selects the remote route and the output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionMode {
    /// Consignment documents to spreadsheet.
    General,
    /// Order info with euro amounts to spreadsheet.
    Currency,
    /// Strip page headers; returns an archive of cleaned files.
    HeaderRemoval,
    /// Strict cleaning of a single document.
    StrictClean,
}

impl ConversionMode {
    pub const ALL: [ConversionMode; 4] = [
        ConversionMode::General,
        ConversionMode::Currency,
        ConversionMode::HeaderRemoval,
        ConversionMode::StrictClean,
    ];

    /// Path segment of the upload endpoint.
    pub fn route(self) -> &'static str {
        match self {
            ConversionMode::General => "convert",
            ConversionMode::Currency => "convert-euro",
            ConversionMode::HeaderRemoval => "remove-headers",
            ConversionMode::StrictClean => "clean-strict",
        }
    }

    /// Category token used in fallback filenames and job ids.
    pub fn category(self) -> &'static str {
        match self {
            ConversionMode::General => "consignment",
            ConversionMode::Currency => "orderinfo",
            ConversionMode::HeaderRemoval => "headerless",
            ConversionMode::StrictClean => "cleaned",
        }
    }

    pub fn output(self) -> OutputKind {
        match self {
            ConversionMode::General | ConversionMode::Currency => OutputKind::Spreadsheet,
            ConversionMode::HeaderRemoval => OutputKind::Archive,
            ConversionMode::StrictClean => OutputKind::Document,
        }
    }

    /// Upper bound on files per submission, if the mode has one.
    pub fn max_files(self) -> Option<usize> {
        match self {
            ConversionMode::StrictClean => Some(1),
            _ => None,
        }
    }

    /// Heading shown while a job in this mode is processing.
    pub fn title(self) -> &'static str {
        match self {
            ConversionMode::General => "Converting your files...",
            ConversionMode::Currency => "Processing Order Info...",
            ConversionMode::HeaderRemoval => "Removing headers...",
            ConversionMode::StrictClean => "Cleaning your document...",
        }
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConversionMode::General => "general conversion",
            ConversionMode::Currency => "currency conversion",
            ConversionMode::HeaderRemoval => "header removal",
            ConversionMode::StrictClean => "strict cleaning",
        };
        f.write_str(label)
    }
}
