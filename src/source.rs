//! Record-source contract implemented by dataset parsers.

use crate::error::Result;
use crate::types::CityRecord;
use std::io::BufRead;

/// Callback invoked once per accepted record, in file order.
pub type RecordCallback<'a> = dyn FnMut(CityRecord) -> Result<()> + 'a;

/// A stream of normalized city records with a stable provenance name.
///
/// Any dataset format can implement this; the index only ever sees
/// normalized records and the source's name, which becomes half of every
/// record's identity key.
pub trait CityRecordSource {
    /// Stable human-readable source identifier.
    fn name(&self) -> &str;

    /// Stream records from `reader`, invoking `callback` once per record
    /// that passes the source's own acceptance rules.
    ///
    /// Returns the number of rows considered, counted before any filtering
    /// a caller applies on top. A callback error aborts parsing and
    /// propagates.
    fn parse(
        &self,
        reader: &mut dyn BufRead,
        callback: &mut RecordCallback<'_>,
    ) -> Result<usize>;
}
