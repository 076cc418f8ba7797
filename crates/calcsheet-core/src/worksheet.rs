//! Worksheet type (the cell store)

use ahash::AHashMap;

use crate::cell::{Cell, CellAddress, CellState, CellValue};
use crate::error::Result;

/// A sparse grid of cells keyed by address
///
/// Cells are created lazily on first write. Reading an address that was
/// never written yields nothing rather than an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Worksheet {
    cells: AHashMap<CellAddress, Cell>,
}

impl Worksheet {
    /// Create an empty worksheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a worksheet from `(address, cell)` pairs in A1 notation
    ///
    /// ```rust
    /// use calcsheet_core::{Cell, Worksheet};
    ///
    /// let sheet = Worksheet::from_entries([
    ///     ("A1", Cell::with_value(2.0)),
    ///     ("B1", Cell::with_formula("A1*2")),
    /// ])
    /// .unwrap();
    /// assert_eq!(sheet.len(), 2);
    /// ```
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Cell)>,
        S: AsRef<str>,
    {
        let mut sheet = Self::new();
        for (address, cell) in entries {
            let addr = CellAddress::parse(address.as_ref())?;
            sheet.cells.insert(addr, cell);
        }
        Ok(sheet)
    }

    /// Number of stored cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no cell is stored
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    // === Cell Access ===

    /// Get a cell by address string (e.g., "A1"); unparseable addresses yield `None`
    pub fn cell(&self, address: &str) -> Option<&Cell> {
        CellAddress::parse(address)
            .ok()
            .and_then(|addr| self.cell_at(addr))
    }

    /// Get a cell by address
    pub fn cell_at(&self, addr: CellAddress) -> Option<&Cell> {
        self.cells.get(&addr)
    }

    /// Get a cell's value by address string
    pub fn value(&self, address: &str) -> Option<&CellValue> {
        self.cell(address).and_then(|c| c.value.as_ref())
    }

    /// Get a cell's value by address
    pub fn value_at(&self, addr: CellAddress) -> Option<&CellValue> {
        self.cell_at(addr).and_then(|c| c.value.as_ref())
    }

    /// Get a cell's formula by address string
    pub fn formula(&self, address: &str) -> Option<&str> {
        self.cell(address).and_then(|c| c.formula.as_deref())
    }

    /// Get a cell's formula by address
    pub fn formula_at(&self, addr: CellAddress) -> Option<&str> {
        self.cell_at(addr).and_then(|c| c.formula.as_deref())
    }

    /// Get a cell's evaluation state by address string
    pub fn state(&self, address: &str) -> CellState<'_> {
        self.cell(address)
            .map(Cell::state)
            .unwrap_or(CellState::Empty)
    }

    /// Get a cell's evaluation state by address
    pub fn state_at(&self, addr: CellAddress) -> CellState<'_> {
        self.cell_at(addr)
            .map(Cell::state)
            .unwrap_or(CellState::Empty)
    }

    /// Iterate over all stored cells, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (CellAddress, &Cell)> {
        self.cells.iter().map(|(addr, cell)| (*addr, cell))
    }

    /// All stored addresses in address order
    pub fn sorted_addresses(&self) -> Vec<CellAddress> {
        let mut addrs: Vec<CellAddress> = self.cells.keys().copied().collect();
        addrs.sort_unstable();
        addrs
    }

    /// Cells holding a formula still awaiting evaluation, in address order
    pub fn pending_cells(&self) -> Vec<(CellAddress, &str)> {
        let mut pending: Vec<(CellAddress, &str)> = self
            .cells
            .iter()
            .filter_map(|(addr, cell)| match cell.state() {
                CellState::Pending(formula) => Some((*addr, formula)),
                _ => None,
            })
            .collect();
        pending.sort_unstable_by_key(|(addr, _)| *addr);
        pending
    }

    // === Cell Modification ===

    /// Set a cell value by address string, keeping any formula
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_value_at(addr, value);
        Ok(())
    }

    /// Set a cell value by address, keeping any formula
    pub fn set_value_at<V: Into<CellValue>>(&mut self, addr: CellAddress, value: V) {
        self.cells.entry(addr).or_default().value = Some(value.into());
    }

    /// Set a cell formula by address string; nothing is evaluated
    pub fn set_cell_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_formula_at(addr, formula);
        Ok(())
    }

    /// Set a cell formula by address; nothing is evaluated
    pub fn set_formula_at(&mut self, addr: CellAddress, formula: &str) {
        self.cells.entry(addr).or_default().formula = Some(formula.to_string());
    }

    /// Store a computed value and clear the formula (Pending -> Literal)
    pub fn settle(&mut self, addr: CellAddress, value: CellValue) {
        self.cells.entry(addr).or_default().settle(value);
    }

    /// Drop a cell's value and keep its formula; unknown addresses are ignored
    pub fn clear_value(&mut self, addr: CellAddress) {
        if let Some(cell) = self.cells.get_mut(&addr) {
            cell.clear_value();
        }
    }

    /// Replace the formula by the error marker (Pending -> Errored)
    pub fn mark_errored(&mut self, addr: CellAddress) {
        self.cells.entry(addr).or_default().mark_errored();
    }
}

impl FromIterator<(CellAddress, Cell)> for Worksheet {
    fn from_iter<I: IntoIterator<Item = (CellAddress, Cell)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Worksheet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for addr in self.sorted_addresses() {
            map.serialize_entry(&addr, &self.cells[&addr])?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Worksheet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let cells = std::collections::BTreeMap::<CellAddress, Cell>::deserialize(deserializer)?;
        Ok(cells.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::ERROR_MARKER;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut sheet = Worksheet::new();
        sheet.set_cell_value("b3", 4.0).unwrap();
        assert_eq!(sheet.value("B3"), Some(&CellValue::Number(4.0)));
        assert_eq!(sheet.value("$B$3"), Some(&CellValue::Number(4.0)));
    }

    #[test]
    fn test_missing_and_invalid_addresses_read_as_nothing() {
        let sheet = Worksheet::new();
        assert_eq!(sheet.value("A1"), None);
        assert_eq!(sheet.formula("A1"), None);
        assert_eq!(sheet.value("not an address"), None);
        assert_eq!(sheet.state("A1"), CellState::Empty);
    }

    #[test]
    fn test_set_value_keeps_formula() {
        let mut sheet = Worksheet::new();
        sheet.set_cell_formula("A1", "B1+1").unwrap();
        sheet.set_cell_value("A1", 9.0).unwrap();
        assert_eq!(sheet.formula("A1"), Some("B1+1"));
        assert_eq!(sheet.value("A1"), Some(&CellValue::Number(9.0)));
        assert_eq!(sheet.state("A1"), CellState::Pending("B1+1"));
    }

    #[test]
    fn test_invalid_address_on_write() {
        let mut sheet = Worksheet::new();
        assert!(sheet.set_cell_value("1A", 1.0).is_err());
        assert!(sheet.set_cell_formula("", "1").is_err());
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_pending_cells_sorted() {
        let sheet = Worksheet::from_entries([
            ("B2", Cell::with_formula("1")),
            ("A1", Cell::with_value(1.0)),
            ("C1", Cell::with_formula("2")),
            ("A2", Cell::with_formula(ERROR_MARKER)),
        ])
        .unwrap();

        let pending: Vec<String> = sheet
            .pending_cells()
            .into_iter()
            .map(|(addr, _)| addr.to_string())
            .collect();
        assert_eq!(pending, vec!["C1", "B2"]);
    }

    #[test]
    fn test_settle_and_mark_errored() {
        let mut sheet = Worksheet::from_entries([("A1", Cell::with_formula("2*3"))]).unwrap();
        let a1 = CellAddress::parse("A1").unwrap();

        sheet.settle(a1, CellValue::Number(6.0));
        assert_eq!(sheet.cell("A1"), Some(&Cell::with_value(6.0)));

        sheet.mark_errored(a1);
        assert_eq!(sheet.formula("A1"), Some(ERROR_MARKER));
        assert_eq!(sheet.value("A1"), None);
    }

    #[test]
    fn test_clear_value_keeps_formula() {
        let mut sheet =
            Worksheet::from_entries([("A1", Cell::with_cached("B1*2", 8.0))]).unwrap();

        sheet.clear_value(CellAddress::parse("A1").unwrap());
        assert_eq!(sheet.state("A1"), CellState::Pending("B1*2"));
        assert_eq!(sheet.value("A1"), None);

        sheet.clear_value(CellAddress::parse("Z9").unwrap());
        assert_eq!(sheet.len(), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_snapshot_json_round_trip() {
        let json = r#"{
            "A1": { "value": 2 },
            "B1": { "value": "text" },
            "C1": { "formula": "A1+1", "value": true },
            "D1": { "value": [0.0, 1.0] }
        }"#;
        let sheet: Worksheet = serde_json::from_str(json).unwrap();
        assert_eq!(sheet.value("A1"), Some(&CellValue::Number(2.0)));
        assert_eq!(sheet.value("B1"), Some(&CellValue::text("text")));
        assert_eq!(sheet.formula("C1"), Some("A1+1"));
        assert_eq!(sheet.value("D1"), Some(&CellValue::complex(0.0, 1.0)));

        let back: Worksheet = serde_json::from_str(&serde_json::to_string(&sheet).unwrap()).unwrap();
        assert_eq!(back, sheet);
    }
}
