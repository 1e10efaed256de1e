/// Input-module flag set for a configuration.
///
/// Each translator kind activates one of a small set of input-handling
/// modules; the flags say which parts of a source document the module
/// processes. Persisted in the header `Modules` parameter as four
/// space-separated bits, e.g. `"1 1 0 0"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModuleFlags {
    pub pages: bool,
    pub projections: bool,
    pub variables: bool,
    pub links: bool,
}

impl ModuleFlags {
    /// Module for the document pass-through translator.
    pub const DOCUMENT: Self = Self {
        pages: true,
        projections: true,
        variables: true,
        links: true,
    };

    /// Module for 2-D output translators (drawings and raster images).
    pub const DRAWING: Self = Self {
        pages: true,
        projections: true,
        variables: false,
        links: false,
    };

    /// Module for 3-D geometry translators.
    pub const GEOMETRY: Self = Self {
        pages: false,
        projections: true,
        variables: true,
        links: false,
    };

    pub fn encode(&self) -> String {
        [self.pages, self.projections, self.variables, self.links]
            .iter()
            .map(|b| if *b { "1" } else { "0" })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parse the persisted flag string. Missing bits are treated as unset so
    /// that documents written by older versions still hydrate.
    pub fn decode(value: &str) -> Self {
        let mut bits = value.split_whitespace().map(|v| v == "1");
        Self {
            pages: bits.next().unwrap_or(false),
            projections: bits.next().unwrap_or(false),
            variables: bits.next().unwrap_or(false),
            links: bits.next().unwrap_or(false),
        }
    }
}

impl Default for ModuleFlags {
    fn default() -> Self {
        Self::DOCUMENT
    }
}
