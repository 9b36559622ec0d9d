use tracing_subscriber::EnvFilter;

mod element;
pub use element::*;

mod parse;
pub use parse::*;

mod molecule;
pub use molecule::*;

mod descriptors;
pub use descriptors::*;

mod dataset;
pub use dataset::*;

mod model;
pub use model::*;

mod config;
pub use config::*;

mod report;
pub use report::*;

mod error;
pub use error::*;

/// An atom of a molecular graph.
///
/// `hydrogens` is the total number of hydrogens carried by the atom once the
/// molecule has been perceived; the raw parser only fills it in for bracket atoms.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: Element,
    pub aromatic: bool,
    pub charge: i8,
    pub hydrogens: u8,
    pub isotope: Option<u16>,
    pub class: Option<u16>,
    /// Written in brackets, so the hydrogen count is explicit.
    pub bracket: bool,
}

impl Atom {
    pub fn new(element: Element, aromatic: bool) -> Self {
        Self {
            element,
            aromatic,
            charge: 0,
            hydrogens: 0,
            isotope: None,
            class: None,
            bracket: false,
        }
    }

    pub fn is_aromatic(&self) -> bool {
        self.aromatic
    }

    pub fn is(&self, element: Element) -> bool {
        self.element == element
    }

    pub fn is_heavy(&self) -> bool {
        !self.element.is_hydrogen()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bond {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl Bond {
    /// Valence units consumed on each end. Aromatic bonds count as one; the
    /// extra π unit is accounted for on the atom.
    pub fn order(&self) -> u8 {
        match self {
            Bond::Single | Bond::Aromatic => 1,
            Bond::Double => 2,
            Bond::Triple => 3,
            Bond::Quadruple => 4,
        }
    }
}

pub type MoleculeGraph = petgraph::graph::UnGraph<Atom, Bond>;

/// Install a stderr `tracing` subscriber filtered at `level`
/// (`"trace"`, `"debug"`, `"info"`, ... or any `EnvFilter` directive).
///
/// Calling it more than once is harmless; later calls keep the first subscriber.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}
