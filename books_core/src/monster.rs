use crate::book::Book;
use crate::document::{Record, Scalar};
use crate::page::{scalar_id, IdRange, LoadContext, PageLike};
use crate::{LoadError, RollError};
use dice_core::DiceExpr;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A monster manual
pub type MonsterBook = Book<MonsterPage>;

/// One monster stat block
#[derive(Debug, Clone, Deserialize)]
pub struct MonsterPage {
    #[serde(rename = "Id")]
    raw_id: Scalar,
    #[serde(skip)]
    id: String,
    #[serde(skip)]
    range: IdRange,

    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "AC", default)]
    pub armour_class: Option<Scalar>,
    #[serde(rename = "HD", default)]
    pub hit_dice: Option<Scalar>,
    /// Hit dice used for rolling hit points, e.g. `3+1`
    #[serde(rename = "HP", default)]
    pub hit_points: Option<Scalar>,
    #[serde(rename = "Move", default)]
    pub movement: Option<Scalar>,
    #[serde(rename = "Attacks", default)]
    pub attacks: Option<Scalar>,
    #[serde(rename = "Damage", default)]
    pub damage: Option<Scalar>,
    /// Number appearing (in lair)
    #[serde(rename = "Number", default)]
    pub number: Option<Scalar>,
    #[serde(rename = "Save", default)]
    pub save: Option<Scalar>,
    #[serde(rename = "Morale", default)]
    pub morale: Option<Scalar>,
    #[serde(rename = "Treasure", default)]
    pub treasure: Option<Scalar>,
    #[serde(rename = "Alignment", default)]
    pub alignment: Option<Scalar>,
    #[serde(rename = "XP", default)]
    pub xp: Option<Scalar>,
    #[serde(rename = "Notes", default)]
    pub notes: Option<Scalar>,

    /// Any other field the manual defines
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl MonsterPage {
    /// Roll hit points for `count` monsters, returned lowest first
    ///
    /// Each monster rolls `<hit dice> * <die>`, where the hit dice is the
    /// part of `HP` before any `+` bonus.
    pub fn roll_hp<R: Rng>(&self, count: usize, die: &str, rng: &mut R) -> Result<Vec<i64>, RollError> {
        let hp = self
            .hit_points
            .as_ref()
            .filter(|hp| !hp.is_blank())
            .ok_or_else(|| RollError::MissingHitDice(self.id.clone()))?
            .to_string();
        let multiplier = hp.split('+').next().unwrap_or_default().trim();
        let expr = DiceExpr::parse(&format!("{} * {}", multiplier, die))?;

        let mut hit_points = (0..count)
            .map(|_| expr.roll(rng).map(|roll| roll.value))
            .collect::<Result<Vec<_>, _>>()?;
        hit_points.sort_unstable();
        Ok(hit_points)
    }
}

impl PageLike for MonsterPage {
    fn from_record(record: Record, ctx: &LoadContext<'_>) -> Result<Self, LoadError> {
        let mut page: MonsterPage =
            serde_json::from_value(Value::Object(record)).map_err(|error| LoadError::InvalidPage {
                book: ctx.book.to_string(),
                error,
            })?;
        let (id, range) = scalar_id(&page.raw_id)?;
        page.id = id;
        page.range = range;
        Ok(page)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn id_range(&self) -> IdRange {
        self.range
    }
}

impl Book<MonsterPage> {
    /// Every monster, groups expanded, sorted by name
    pub fn index_by_name(&self) -> Vec<&MonsterPage> {
        let mut monsters: Vec<&MonsterPage> = self.index().flat_map(|slot| slot.pages()).collect();
        monsters.sort_by(|a, b| a.name.cmp(&b.name));
        monsters
    }
}
