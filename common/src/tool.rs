//! Traits for abstraction of content tools.

/// Trait that represents a functionality of a command line tool
/// (eg. `matinfo`).
///
/// Every tool can be executed with a specified set of parameters. Some tools
/// do side-effects according to the parameters (eg. printing a report) while
/// others only compute something and return it.
pub trait Tool {
    /// A type that represents possible parameters accepted by this tool. This
    /// is usually a struct parsed by `structopt`.
    type Params;

    /// Type that represents output of the `execute` function.
    type Result;

    /// Performs the effect of this tool with specified parameters.
    fn execute(&self, params: Self::Params) -> Self::Result;
}
