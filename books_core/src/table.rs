use crate::book::{Book, BookHeader, BookKind};
use crate::config::LoadOptions;
use crate::document::{BookDocument, EntryDocument, Record};
use crate::page::{scalar_id, IdRange, LoadContext, PageLike, PageSlot};
use crate::template::resolve_details;
use crate::{LoadError, RollError};
use dice_core::DiceExpr;
use rand::Rng;
use serde_json::Value;
use std::str::FromStr;

/// Deepest chain of nested sub-tables accepted
pub const MAX_NESTING: usize = 16;

/// How a nested table's result merges into its parent entry text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CombinePolicy {
    /// The sub-table result replaces the entry text
    #[default]
    Replace,
    /// Entry text, newline, sub-table result
    Append,
    /// Entry text immediately followed by the sub-table result
    Concat,
}

impl CombinePolicy {
    pub fn merge(self, text: String, nested: &str) -> String {
        match self {
            CombinePolicy::Replace => nested.to_string(),
            CombinePolicy::Append => format!("{}\n{}", text, nested),
            CombinePolicy::Concat => text + nested,
        }
    }
}

impl FromStr for CombinePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(CombinePolicy::Replace),
            "append" => Ok(CombinePolicy::Append),
            "concat" => Ok(CombinePolicy::Concat),
            other => Err(other.to_string()),
        }
    }
}

/// Outcome of rolling a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRoll {
    /// Text of every matching entry, one per line; empty when nothing matched
    pub result: String,
    /// `<die> -> **<rolled>**` for this table, then the lines of each nested roll
    pub explanation: Vec<String>,
}

/// One rollable row of a table
#[derive(Debug, Clone)]
pub struct TableEntry {
    id: String,
    range: IdRange,
    details: String,
    number: Option<DiceExpr>,
    number_text: Option<String>,
    table: Option<Box<Table>>,
}

impl TableEntry {
    /// Template text with `#`/`$` markers
    pub fn details(&self) -> &str {
        &self.details
    }

    /// Dice expression for the pluralization count
    pub fn number(&self) -> Option<&str> {
        self.number_text.as_deref()
    }

    /// Nested sub-table
    pub fn table(&self) -> Option<&Table> {
        self.table.as_deref()
    }

    /// Roll the count and resolve the template
    pub fn resolve<R: Rng>(&self, singular: &str, rng: &mut R) -> Result<String, RollError> {
        let count = match &self.number {
            Some(expr) => expr.roll(rng)?.value,
            None => 0,
        };
        Ok(resolve_details(&self.details, count, singular))
    }
}

impl PageLike for TableEntry {
    fn from_record(record: Record, ctx: &LoadContext<'_>) -> Result<Self, LoadError> {
        let entry: EntryDocument =
            serde_json::from_value(Value::Object(record)).map_err(|error| LoadError::InvalidPage {
                book: ctx.book.to_string(),
                error,
            })?;
        let (id, range) = scalar_id(&entry.id)?;

        let number_text = entry
            .number
            .filter(|n| !n.is_blank())
            .map(|n| n.to_string());
        let number = number_text
            .as_deref()
            .map(|expr| parse_dice(ctx.book, expr))
            .transpose()?;

        let table = match entry.table {
            Some(doc) => Some(Box::new(Table::load_at(doc, ctx.options, ctx.depth + 1)?)),
            None => None,
        };

        Ok(TableEntry {
            id,
            range,
            details: entry.details,
            number,
            number_text,
            table,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn id_range(&self) -> IdRange {
        self.range
    }
}

fn parse_dice(book: &str, expr: &str) -> Result<DiceExpr, LoadError> {
    DiceExpr::parse(expr).map_err(|error| LoadError::InvalidDice {
        book: book.to_string(),
        expr: expr.to_string(),
        error,
    })
}

/// A book of rollable entries
#[derive(Debug, Clone)]
pub struct Table {
    book: Book<TableEntry>,
    die: String,
    die_expr: DiceExpr,
    forced_roll: Option<i64>,
    combine: CombinePolicy,
    singular: String,
}

impl Table {
    /// Build a table, including its nested sub-tables, from a document
    pub fn from_document(doc: BookDocument, options: &LoadOptions) -> Result<Self, LoadError> {
        Self::load_at(doc, options, 0)
    }

    fn load_at(doc: BookDocument, options: &LoadOptions, depth: usize) -> Result<Self, LoadError> {
        let header = BookHeader::from_document(&doc)?;
        if header.kind != BookKind::Table {
            return Err(LoadError::UnexpectedBookType {
                book: header.id,
                kind: header.kind,
            });
        }
        if depth > MAX_NESTING {
            return Err(LoadError::NestingTooDeep(header.id));
        }

        let die = doc.die.clone().ok_or_else(|| LoadError::MissingField {
            book: header.id.clone(),
            field: "Die",
        })?;
        let die_expr = parse_dice(&header.id, &die)?;

        let forced_roll = match &doc.forced_roll {
            Some(value) if !value.is_blank() => {
                let text = value.to_string();
                let rolled = text.trim().parse::<i64>().map_err(|_| LoadError::InvalidForcedRoll {
                    book: header.id.clone(),
                    value: text.clone(),
                })?;
                Some(rolled)
            }
            _ => None,
        };

        let combine = match doc.rop.as_deref() {
            Some(rop) => rop.parse::<CombinePolicy>().map_err(|value| LoadError::InvalidCombinePolicy {
                book: header.id.clone(),
                value,
            })?,
            None => CombinePolicy::default(),
        };

        let book = Book::load_at(doc, true, options, depth)?;
        tracing::info!("  {} entries found in table \"{}\"", book.len(), book.id());

        Ok(Table {
            book,
            die,
            die_expr,
            forced_roll,
            combine,
            singular: options.singular.clone(),
        })
    }

    pub fn book(&self) -> &Book<TableEntry> {
        &self.book
    }

    pub fn id(&self) -> &str {
        self.book.id()
    }

    pub fn title(&self) -> &str {
        self.book.title()
    }

    pub fn die(&self) -> &str {
        &self.die
    }

    pub fn forced_roll(&self) -> Option<i64> {
        self.forced_roll
    }

    pub fn combine(&self) -> CombinePolicy {
        self.combine
    }

    pub fn search(&self, id: &str) -> Option<&PageSlot<TableEntry>> {
        self.book.search(id)
    }

    pub fn index(&self) -> impl Iterator<Item = &PageSlot<TableEntry>> {
        self.book.index()
    }

    /// Every entry whose id range contains `rolled`, groups expanded, in load order
    pub fn find(&self, rolled: i64) -> Vec<&TableEntry> {
        self.book
            .index()
            .filter(|slot| slot.id_range().contains(rolled))
            .flat_map(|slot| slot.pages())
            .collect()
    }

    /// Roll on this table and every sub-table the matching entries chain into
    ///
    /// Recursion is bounded by the nesting accepted at load, at most [`MAX_NESTING`] levels.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> Result<TableRoll, RollError> {
        // The die is rolled even when forced so that the breakdown stays honest
        let roll = self.die_expr.roll(rng)?;
        let rolled = self.forced_roll.unwrap_or(roll.value);
        tracing::debug!(
            "rolled {} in {} ({}) for {}",
            rolled,
            self.die,
            roll.explanation,
            self.title()
        );

        let mut explanation = vec![format!("{} -> **{}**", self.die, rolled)];
        let mut results = Vec::new();

        for entry in self.find(rolled) {
            let mut text = entry.resolve(&self.singular, rng)?;
            if let Some(table) = entry.table() {
                let nested = table.roll(rng)?;
                if !nested.result.is_empty() {
                    text = table.combine.merge(text, &nested.result);
                }
                explanation.extend(nested.explanation);
            }
            results.push(text);
        }

        let result = results.join("\n");
        tracing::debug!("> {}\n{}", result, explanation.join("\n"));
        Ok(TableRoll {
            result,
            explanation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dice_core::DiceError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    fn table(value: Value) -> Table {
        let doc: BookDocument = serde_json::from_value(value).unwrap();
        Table::from_document(doc, &LoadOptions::default()).unwrap()
    }

    fn load_err(value: Value) -> LoadError {
        let doc: BookDocument = serde_json::from_value(value).unwrap();
        Table::from_document(doc, &LoadOptions::default()).unwrap_err()
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(1234)
    }

    fn chest(rop: &str) -> Table {
        table(json!({
            "Id": "chest", "Title": "Chest", "Type": 2,
            "Die": "1d6", "forced_roll": "4",
            "Pages": [
                {"Id": "1-3", "Details": "Empty."},
                {"Id": "4-6", "Details": "You find a chest.",
                 "Table": {
                    "Id": "gold", "Title": "Gold", "Type": 2,
                    "Die": "1d10", "forced_roll": "2", "rop": rop,
                    "Pages": [{"Id": "1-10", "Details": "Gold: 20gp"}]
                 }}
            ]
        }))
    }

    #[test]
    fn test_forced_roll_matches_range() {
        let t = chest("append");
        let roll = t.roll(&mut rng()).unwrap();
        assert_eq!(roll.explanation, vec!["1d6 -> **4**", "1d10 -> **2**"]);
    }

    #[test]
    fn test_append_policy() {
        let roll = chest("append").roll(&mut rng()).unwrap();
        assert_eq!(roll.result, "You find a chest.\nGold: 20gp");
    }

    #[test]
    fn test_concat_policy() {
        let roll = chest("concat").roll(&mut rng()).unwrap();
        assert_eq!(roll.result, "You find a chest.Gold: 20gp");
    }

    #[test]
    fn test_replace_policy() {
        let roll = chest("replace").roll(&mut rng()).unwrap();
        assert_eq!(roll.result, "Gold: 20gp");
        assert_eq!(chest("replace").book().len(), 2);
    }

    #[test]
    fn test_default_policy_is_replace() {
        let t = table(json!({
            "Id": "t", "Title": "T", "Type": 2, "Die": "1", "Pages": [{"Id": "1", "Details": "x"}]
        }));
        assert_eq!(t.combine(), CombinePolicy::Replace);
        assert_eq!(t.forced_roll(), None);
    }

    #[test]
    fn test_forced_roll_is_repeatable() {
        let t = chest("append");
        let mut r = ChaCha8Rng::seed_from_u64(99);
        let first = t.roll(&mut r).unwrap();
        for _ in 0..10 {
            assert_eq!(t.roll(&mut r).unwrap(), first);
        }
    }

    #[test]
    fn test_empty_nested_result_keeps_parent_text() {
        let t = table(json!({
            "Id": "outer", "Title": "Outer", "Type": 2, "Die": "1",
            "Pages": [{"Id": "1", "Details": "Tracks.",
                "Table": {"Id": "inner", "Title": "Inner", "Type": 2, "Die": "1d4",
                          "forced_roll": 9, "Pages": [{"Id": "1-4", "Details": "Wolves"}]}}]
        }));
        let roll = t.roll(&mut rng()).unwrap();
        assert_eq!(roll.result, "Tracks.");
        assert_eq!(roll.explanation, vec!["1 -> **1**", "1d4 -> **9**"]);
    }

    #[test]
    fn test_overlapping_ranges_and_groups_all_apply() {
        let t = table(json!({
            "Id": "enc", "Title": "Encounters", "Type": 2, "Die": "1d20", "forced_roll": "5",
            "Pages": [
                {"Id": "1-10", "Details": "Rain"},
                {"Id": "5", "Details": "Bandits"},
                {"Id": "11-20", "Details": "Sun"},
                {"Id": "5", "Details": "A merchant"}
            ]
        }));
        assert_eq!(t.find(5).len(), 3);
        let roll = t.roll(&mut rng()).unwrap();
        assert_eq!(roll.result, "Rain\nBandits\nA merchant");
    }

    #[test]
    fn test_no_match_is_empty() {
        let t = table(json!({
            "Id": "gap", "Title": "Gap", "Type": 2, "Die": "1d6", "forced_roll": "6",
            "Pages": [{"Id": "1-3", "Details": "Low"}]
        }));
        let roll = t.roll(&mut rng()).unwrap();
        assert_eq!(roll.result, "");
        assert_eq!(roll.explanation, vec!["1d6 -> **6**"]);
    }

    #[test]
    fn test_number_pluralizes_details() {
        let t = table(json!({
            "Id": "wm", "Title": "Wandering", "Type": 2, "Die": "1",
            "Pages": [
                {"Id": "1", "Details": "# goblin$ appear", "Number": "3"},
                {"Id": "1", "Details": "# bruix$(es)", "Number": 1},
                {"Id": "1", "Details": "# rat$", "Number": ""}
            ]
        }));
        let roll = t.roll(&mut rng()).unwrap();
        assert_eq!(roll.result, "3 goblins appear\none bruix(es)\n rat");
    }

    #[test]
    fn test_singular_word_from_options() {
        let doc: BookDocument = serde_json::from_value(json!({
            "Id": "es", "Title": "ES", "Type": 2, "Die": "1",
            "Pages": [{"Id": "1", "Details": "# orco", "Number": "1"}]
        }))
        .unwrap();
        let options = LoadOptions {
            singular: "un".to_string(),
        };
        let t = Table::from_document(doc, &options).unwrap();
        assert_eq!(t.roll(&mut rng()).unwrap().result, "un orco");
    }

    #[test]
    fn test_unforced_roll_lands_in_contributing_range() {
        let t = table(json!({
            "Id": "d8", "Title": "D8", "Type": 2, "Die": "1d8",
            "Pages": [{"Id": "1-2", "Details": "A"}, {"Id": "3-5", "Details": "B"}]
        }));
        let mut r = rng();
        for _ in 0..100 {
            let roll = t.roll(&mut r).unwrap();
            let rolled: i64 = roll.explanation[0]
                .trim_start_matches("1d8 -> **")
                .trim_end_matches("**")
                .parse()
                .unwrap();
            assert!((1..=8).contains(&rolled));
            match roll.result.as_str() {
                "" => assert!(rolled > 5),
                "A" => assert!(rolled <= 2),
                "B" => assert!((3..=5).contains(&rolled)),
                other => panic!("Unexpected result {}", other),
            }
        }
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            load_err(json!({"Id": "t", "Title": "T", "Type": 2, "Pages": []})),
            LoadError::MissingField { field: "Die", .. }
        ));
        assert!(matches!(
            load_err(json!({"Id": "t", "Title": "T", "Type": 2, "Die": "1d", "Pages": []})),
            LoadError::InvalidDice { .. }
        ));
        assert!(matches!(
            load_err(json!({"Id": "t", "Title": "T", "Type": 2, "Die": "1d6",
                            "forced_roll": "six", "Pages": []})),
            LoadError::InvalidForcedRoll { .. }
        ));
        assert!(matches!(
            load_err(json!({"Id": "t", "Title": "T", "Type": 2, "Die": "1d6",
                            "rop": "merge", "Pages": []})),
            LoadError::InvalidCombinePolicy { .. }
        ));
        assert!(matches!(
            load_err(json!({"Id": "t", "Title": "T", "Type": 1, "Die": "1d6", "Pages": []})),
            LoadError::UnexpectedBookType { .. }
        ));
        assert!(matches!(
            load_err(json!({"Id": "t", "Title": "T", "Type": 2, "Die": "1d6",
                            "Pages": [{"Id": "1", "Details": "x", "Number": "2d"}]})),
            LoadError::InvalidDice { .. }
        ));
        assert!(matches!(
            load_err(json!({"Id": "t", "Title": "T", "Type": 2, "Die": "1d6",
                            "Pages": [{"Id": "1"}]})),
            LoadError::InvalidPage { .. }
        ));
    }

    #[test]
    fn test_number_overflow_is_a_dice_error() {
        let t = table(json!({
            "Id": "hoard", "Title": "Hoard", "Type": 2, "Die": "1",
            "Pages": [{"Id": "1", "Details": "# coin$", "Number": "9223372036854775807 * 2"}]
        }));
        assert!(matches!(
            t.roll(&mut rng()),
            Err(RollError::Dice(DiceError::Overflow))
        ));
    }

    #[test]
    fn test_nesting_too_deep() {
        let mut doc = json!({
            "Id": "leaf", "Title": "Leaf", "Type": 2, "Die": "1",
            "Pages": [{"Id": "1", "Details": "bottom"}]
        });
        for level in 0..=MAX_NESTING {
            doc = json!({
                "Id": format!("level{}", level), "Title": "Level", "Type": 2, "Die": "1",
                "Pages": [{"Id": "1", "Details": "", "Table": doc}]
            });
        }
        assert!(matches!(load_err(doc), LoadError::NestingTooDeep(_)));
    }

    #[test]
    fn test_deep_chain_within_limit_rolls() {
        let mut doc = json!({
            "Id": "leaf", "Title": "Leaf", "Type": 2, "Die": "1", "rop": "concat",
            "Pages": [{"Id": "1", "Details": "!"}]
        });
        for level in 0..3 {
            doc = json!({
                "Id": format!("level{}", level), "Title": "Level", "Type": 2, "Die": "1",
                "rop": "concat",
                "Pages": [{"Id": "1", "Details": "a", "Table": doc}]
            });
        }
        let roll = table(doc).roll(&mut rng()).unwrap();
        assert_eq!(roll.result, "aaa!");
        assert_eq!(roll.explanation.len(), 4);
    }
}
