//! Typed views over the ROM's fixed-layout asset tables.
//!
//! Every record type is parsed once at load and written back on `persist`;
//! nothing outside this module touches raw offsets. Multi-byte fields are
//! little-endian and oversized values clamp to their field width on write.

use crate::rom::Rom;
use crate::{RandomizerError, Result};

pub const ITEM_BASE: usize = 0x60000;
pub const ITEM_COUNT: usize = 0x100;
const ITEM_SIZE: usize = 16;

pub const MONSTER_BASE: usize = 0x68000;
pub const MONSTER_COUNT: usize = 0xA0;
const MONSTER_SIZE: usize = 32;

pub const DROP_BASE: usize = 0x6A000;
pub const DROP_COUNT: usize = 0x40;
const DROP_SIZE: usize = 2;

pub const FUSION_BASE: usize = 0x6B000;
pub const FUSION_COUNT: usize = 0x24;
const FUSION_SIZE: usize = 8;

pub const COMBO_BASE: usize = 0x6B800;
pub const COMBO_OWNER_COUNT: usize = 8;
pub const COMBO_SLOT_COUNT: usize = 21;

pub const CHARACTER_BASE: usize = 0x6C000;
pub const CHARACTER_COUNT: usize = 9;
const CHARACTER_SIZE: usize = 24;

pub const CURVE_BASE: usize = 0x6D000;
const CURVE_LEVELS: usize = 98;
const CURVE_SIZE: usize = CURVE_LEVELS * 4;

pub const SPELL_BASE: usize = 0x6F000;
pub const SPELL_COUNT: usize = 0x40;
const SPELL_SIZE: usize = 12;

pub const CHEST_BASE: usize = 0x70000;
pub const CHEST_COUNT: usize = 0x80;
const CHEST_SIZE: usize = 4;

pub const LEARN_BASE: usize = 0x5AA00;
pub const LEARN_END: usize = 0x5AB00;

pub const INITIAL_BASE: usize = 0x5B000;
pub const INITIAL_COUNT: usize = 0x60;
const INITIAL_SIZE: usize = 3;

pub const SHOP_BASE: usize = 0x3FAC0;
pub const SHOP_MAX: usize = 0x3FBAD;

pub const ZONE_BASE: usize = 0x71000;
pub const ZONE_COUNT: usize = 0x80;
pub const ZONE_FORMATIONS: usize = 8;

const NAME_LEN: usize = 8;

fn display_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim_end().to_string()
}

/// Item category, computed once at load from the type byte and index ranges
/// and matched exhaustively afterwards.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ItemKind {
    Weapon,
    Armor,
    Helmet,
    Shield,
    Accessory,
    Dragon,
    Fishing,
    Consumable,
}

/// Coarser grouping used by similar-kind substitution: gear of any slot is
/// interchangeable, accessories and fishing gear only swap among themselves.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SimilarClass {
    Gear,
    Accessory,
    Fishing,
    Plain,
}

impl ItemKind {
    pub fn classify(item_type: u8, index: u8) -> ItemKind {
        const WEAPON_TYPES: [u8; 10] =
            [0x05, 0x8A, 0x8B, 0x8C, 0x8E, 0x8F, 0x90, 0x91, 0x92, 0x97];

        // Dragon transformation items double as gear at a few fixed indexes.
        if item_type == 0x8D {
            return match index {
                0x7B => ItemKind::Weapon,
                0xDD => ItemKind::Armor,
                0xEE => ItemKind::Shield,
                0xF4 => ItemKind::Helmet,
                _ => ItemKind::Dragon,
            };
        }
        if (0x3F..=0x50).contains(&index) {
            return ItemKind::Accessory;
        }
        if WEAPON_TYPES.contains(&item_type) {
            return ItemKind::Weapon;
        }
        match item_type {
            0x94 | 0x95 => ItemKind::Armor,
            0x93 => ItemKind::Helmet,
            0x96 => ItemKind::Shield,
            0xF7 => ItemKind::Fishing,
            _ => ItemKind::Consumable,
        }
    }

    pub fn is_equippable(self) -> bool {
        match self {
            ItemKind::Weapon
            | ItemKind::Armor
            | ItemKind::Helmet
            | ItemKind::Shield
            | ItemKind::Accessory
            | ItemKind::Dragon => true,
            ItemKind::Fishing | ItemKind::Consumable => false,
        }
    }

    pub fn similar_class(self) -> SimilarClass {
        match self {
            ItemKind::Accessory => SimilarClass::Accessory,
            ItemKind::Fishing => SimilarClass::Fishing,
            ItemKind::Weapon
            | ItemKind::Armor
            | ItemKind::Helmet
            | ItemKind::Shield
            | ItemKind::Dragon => SimilarClass::Gear,
            ItemKind::Consumable => SimilarClass::Plain,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Item {
    pub index: u8,
    pub name: [u8; NAME_LEN],
    pub price: u16,
    pub power: u8,
    pub item_type: u8,
    pub equippable: u8,
    pub cant_be_sold: bool,
    pub kind: ItemKind,
}

impl Item {
    fn read(rom: &Rom, index: usize) -> Item {
        let base = ITEM_BASE + index * ITEM_SIZE;
        let mut name = [0u8; NAME_LEN];
        name.copy_from_slice(&rom.bytes[base..base + NAME_LEN]);
        let item_type = rom.read_u8(base + 11);
        Item {
            index: index as u8,
            name,
            price: rom.read_u16(base + 8),
            power: rom.read_u8(base + 10),
            item_type,
            equippable: rom.read_u8(base + 12),
            cant_be_sold: rom.read_u8(base + 13) & 1 != 0,
            kind: ItemKind::classify(item_type, index as u8),
        }
    }

    fn write(&self, rom: &mut Rom) {
        let base = ITEM_BASE + self.index as usize * ITEM_SIZE;
        rom.write_bytes(base, &self.name);
        rom.write_u16(base + 8, self.price as u32);
        rom.write_u8(base + 10, self.power as u32);
        rom.write_u8(base + 11, self.item_type as u32);
        rom.write_u8(base + 12, self.equippable as u32);
        let flags = (rom.read_u8(base + 13) & !1) | (self.cant_be_sold as u8);
        rom.write_u8(base + 13, flags as u32);
    }

    pub fn display_name(&self) -> String {
        display_name(&self.name)
    }

    pub fn key_item(&self) -> bool {
        const KEY_ITEM_IDS: [u8; 1] = [0x57];
        if KEY_ITEM_IDS.contains(&self.index) {
            return true;
        }
        self.cant_be_sold && !self.kind.is_equippable()
    }

    pub fn is_booster(&self) -> bool {
        (0x0D..=0x12).contains(&self.index)
    }

    /// Dragon transformation items, including the four that double as gear.
    pub fn is_dragon(&self) -> bool {
        self.item_type == 0x8D
    }
}

/// Per-level stat gains, nibble-packed four bytes per level in the ROM.
#[derive(Copy, Clone, Debug, Default)]
pub struct LevelGain {
    pub hp: u8,
    pub ap: u8,
    pub strength: u8,
    pub stamina: u8,
    pub agility: u8,
    pub wisdom: u8,
    pub luck: u8,
}

/// Stat axis shared by characters and level curves.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Stat {
    Hp,
    Ap,
    Strength,
    Stamina,
    Agility,
    Wisdom,
    Luck,
}

impl LevelGain {
    pub fn get(&self, stat: Stat) -> u8 {
        match stat {
            Stat::Hp => self.hp,
            Stat::Ap => self.ap,
            Stat::Strength => self.strength,
            Stat::Stamina => self.stamina,
            Stat::Agility => self.agility,
            Stat::Wisdom => self.wisdom,
            Stat::Luck => self.luck,
        }
    }

    pub fn set(&mut self, stat: Stat, value: u8) {
        let slot = match stat {
            Stat::Hp => &mut self.hp,
            Stat::Ap => &mut self.ap,
            Stat::Strength => &mut self.strength,
            Stat::Stamina => &mut self.stamina,
            Stat::Agility => &mut self.agility,
            Stat::Wisdom => &mut self.wisdom,
            Stat::Luck => &mut self.luck,
        };
        *slot = value.min(0xF);
    }
}

/// A character's level curve: gains for levels 2..=99.
#[derive(Clone, Debug)]
pub struct LevelCurve {
    pub index: u8,
    pub gains: Vec<LevelGain>,
}

impl LevelCurve {
    fn read(rom: &Rom, index: usize) -> LevelCurve {
        let base = CURVE_BASE + index * CURVE_SIZE;
        let mut gains = Vec::with_capacity(CURVE_LEVELS);
        for level in 0..CURVE_LEVELS {
            let off = base + level * 4;
            let b = &rom.bytes[off..off + 4];
            gains.push(LevelGain {
                hp: b[0] >> 4,
                ap: b[0] & 0xF,
                strength: b[1] >> 4,
                stamina: b[1] & 0xF,
                // High nibble of the third byte is unused padding.
                agility: b[2] & 0xF,
                wisdom: b[3] >> 4,
                luck: b[3] & 0xF,
            });
        }
        LevelCurve {
            index: index as u8,
            gains,
        }
    }

    fn write(&self, rom: &mut Rom) {
        let base = CURVE_BASE + self.index as usize * CURVE_SIZE;
        for (level, gain) in self.gains.iter().enumerate() {
            let off = base + level * 4;
            rom.bytes[off] = (gain.hp << 4) | (gain.ap & 0xF);
            rom.bytes[off + 1] = (gain.strength << 4) | (gain.stamina & 0xF);
            rom.bytes[off + 2] = gain.agility & 0xF;
            rom.bytes[off + 3] = (gain.wisdom << 4) | (gain.luck & 0xF);
        }
    }

    /// Cumulative gain for a stat from level 2 up to and including `level`.
    pub fn value_at_level(&self, stat: Stat, level: u8) -> u32 {
        self.gains
            .iter()
            .take((level as usize).saturating_sub(1))
            .map(|g| g.get(stat) as u32)
            .sum()
    }
}

#[derive(Clone, Debug)]
pub struct Monster {
    pub index: u8,
    pub name: [u8; NAME_LEN],
    pub hp: u16,
    pub ap: u16,
    pub atp: u16,
    pub dfp: u16,
    pub agl: u16,
    pub ms: u8,
    pub luck: u8,
    pub xp: u16,
    pub gp: u16,
    pub treasure_set: u8,
    pub treasure_class: u8,
    pub immunity: u8,
    pub ai: u8,
    pub boss: bool,
}

impl Monster {
    fn read(rom: &Rom, index: usize) -> Monster {
        let base = MONSTER_BASE + index * MONSTER_SIZE;
        let mut name = [0u8; NAME_LEN];
        name.copy_from_slice(&rom.bytes[base..base + NAME_LEN]);
        Monster {
            index: index as u8,
            name,
            hp: rom.read_u16(base + 8),
            ap: rom.read_u16(base + 10),
            atp: rom.read_u16(base + 12),
            dfp: rom.read_u16(base + 14),
            agl: rom.read_u16(base + 16),
            ms: rom.read_u8(base + 18),
            luck: rom.read_u8(base + 19),
            xp: rom.read_u16(base + 20),
            gp: rom.read_u16(base + 22),
            treasure_set: rom.read_u8(base + 24),
            treasure_class: rom.read_u8(base + 25),
            immunity: rom.read_u8(base + 26),
            ai: rom.read_u8(base + 27),
            boss: rom.read_u8(base + 28) & 1 != 0,
        }
    }

    fn write(&self, rom: &mut Rom) {
        let base = MONSTER_BASE + self.index as usize * MONSTER_SIZE;
        rom.write_bytes(base, &self.name);
        rom.write_u16(base + 8, self.hp as u32);
        rom.write_u16(base + 10, self.ap as u32);
        rom.write_u16(base + 12, self.atp as u32);
        rom.write_u16(base + 14, self.dfp as u32);
        rom.write_u16(base + 16, self.agl as u32);
        rom.write_u8(base + 18, self.ms as u32);
        rom.write_u8(base + 19, self.luck as u32);
        rom.write_u16(base + 20, self.xp as u32);
        rom.write_u16(base + 22, self.gp as u32);
        rom.write_u8(base + 24, self.treasure_set as u32);
        rom.write_u8(base + 25, self.treasure_class as u32);
        rom.write_u8(base + 26, self.immunity as u32);
        rom.write_u8(base + 27, self.ai as u32);
        let flags = (rom.read_u8(base + 28) & !1) | (self.boss as u8);
        rom.write_u8(base + 28, flags as u32);
    }

    pub fn display_name(&self) -> String {
        display_name(&self.name)
    }
}

/// Common/rare pair of item references one treasure set grants.
#[derive(Clone, Debug)]
pub struct DropTable {
    pub index: u8,
    pub common: u8,
    pub rare: u8,
}

impl DropTable {
    fn read(rom: &Rom, index: usize) -> DropTable {
        let base = DROP_BASE + index * DROP_SIZE;
        DropTable {
            index: index as u8,
            common: rom.read_u8(base),
            rare: rom.read_u8(base + 1),
        }
    }

    fn write(&self, rom: &mut Rom) {
        let base = DROP_BASE + self.index as usize * DROP_SIZE;
        rom.write_u8(base, self.common as u32);
        rom.write_u8(base + 1, self.rare as u32);
    }
}

#[derive(Clone, Debug)]
pub struct Fusion {
    pub index: u8,
    pub off: u8,
    pub def: u8,
    pub vig: u8,
    pub wis: u8,
    pub map: u8,
    pub luk: u8,
    pub character: u8,
}

impl Fusion {
    fn read(rom: &Rom, index: usize) -> Fusion {
        let base = FUSION_BASE + index * FUSION_SIZE;
        Fusion {
            index: index as u8,
            off: rom.read_u8(base),
            def: rom.read_u8(base + 1),
            vig: rom.read_u8(base + 2),
            wis: rom.read_u8(base + 3),
            map: rom.read_u8(base + 4),
            luk: rom.read_u8(base + 5),
            character: rom.read_u8(base + 6),
        }
    }

    fn write(&self, rom: &mut Rom) {
        let base = FUSION_BASE + self.index as usize * FUSION_SIZE;
        rom.write_u8(base, self.off as u32);
        rom.write_u8(base + 1, self.def as u32);
        rom.write_u8(base + 2, self.vig as u32);
        rom.write_u8(base + 3, self.wis as u32);
        rom.write_u8(base + 4, self.map as u32);
        rom.write_u8(base + 5, self.luk as u32);
        rom.write_u8(base + 6, self.character as u32);
    }
}

/// One owner's fusion slot row: a fusion reference (index + 1, 0 = none) per
/// element combination.
#[derive(Clone, Debug)]
pub struct ComboSlots {
    pub owner: u8,
    pub fusions: [u8; COMBO_SLOT_COUNT],
}

impl ComboSlots {
    fn read(rom: &Rom, owner: usize) -> ComboSlots {
        let base = COMBO_BASE + owner * COMBO_SLOT_COUNT;
        let mut fusions = [0u8; COMBO_SLOT_COUNT];
        fusions.copy_from_slice(&rom.bytes[base..base + COMBO_SLOT_COUNT]);
        ComboSlots {
            owner: owner as u8,
            fusions,
        }
    }

    fn write(&self, rom: &mut Rom) {
        let base = COMBO_BASE + self.owner as usize * COMBO_SLOT_COUNT;
        rom.write_bytes(base, &self.fusions);
    }
}

#[derive(Clone, Debug)]
pub struct Character {
    pub index: u8,
    pub name: [u8; NAME_LEN],
    pub level: u8,
    pub strength: u8,
    pub stamina: u8,
    pub agility: u8,
    pub wisdom: u8,
    pub luck: u8,
    pub max_hp: u16,
    pub max_ap: u16,
    pub guts: u8,
    pub weapon: u8,
    pub shield: u8,
    pub helmet: u8,
    pub armor: u8,
}

impl Character {
    fn read(rom: &Rom, index: usize) -> Character {
        let base = CHARACTER_BASE + index * CHARACTER_SIZE;
        let mut name = [0u8; NAME_LEN];
        name.copy_from_slice(&rom.bytes[base..base + NAME_LEN]);
        Character {
            index: index as u8,
            name,
            level: rom.read_u8(base + 8),
            strength: rom.read_u8(base + 9),
            stamina: rom.read_u8(base + 10),
            agility: rom.read_u8(base + 11),
            wisdom: rom.read_u8(base + 12),
            luck: rom.read_u8(base + 13),
            max_hp: rom.read_u16(base + 14),
            max_ap: rom.read_u16(base + 16),
            guts: rom.read_u8(base + 18),
            weapon: rom.read_u8(base + 19),
            shield: rom.read_u8(base + 20),
            helmet: rom.read_u8(base + 21),
            armor: rom.read_u8(base + 22),
        }
    }

    fn write(&self, rom: &mut Rom) {
        let base = CHARACTER_BASE + self.index as usize * CHARACTER_SIZE;
        rom.write_bytes(base, &self.name);
        rom.write_u8(base + 8, self.level as u32);
        rom.write_u8(base + 9, self.strength as u32);
        rom.write_u8(base + 10, self.stamina as u32);
        rom.write_u8(base + 11, self.agility as u32);
        rom.write_u8(base + 12, self.wisdom as u32);
        rom.write_u8(base + 13, self.luck as u32);
        rom.write_u16(base + 14, self.max_hp as u32);
        rom.write_u16(base + 16, self.max_ap as u32);
        rom.write_u8(base + 18, self.guts as u32);
        rom.write_u8(base + 19, self.weapon as u32);
        rom.write_u8(base + 20, self.shield as u32);
        rom.write_u8(base + 21, self.helmet as u32);
        rom.write_u8(base + 22, self.armor as u32);
    }

    pub fn display_name(&self) -> String {
        display_name(&self.name)
    }

    pub fn get_stat(&self, stat: Stat) -> u32 {
        match stat {
            Stat::Hp => self.max_hp as u32,
            Stat::Ap => self.max_ap as u32,
            Stat::Strength => self.strength as u32,
            Stat::Stamina => self.stamina as u32,
            Stat::Agility => self.agility as u32,
            Stat::Wisdom => self.wisdom as u32,
            Stat::Luck => self.luck as u32,
        }
    }

    pub fn set_stat(&mut self, stat: Stat, value: u32) {
        match stat {
            Stat::Hp => self.max_hp = value.min(0xFFFF) as u16,
            Stat::Ap => self.max_ap = value.min(0xFFFF) as u16,
            Stat::Strength => self.strength = value.min(0xFF) as u8,
            Stat::Stamina => self.stamina = value.min(0xFF) as u8,
            Stat::Agility => self.agility = value.min(0xFF) as u8,
            Stat::Wisdom => self.wisdom = value.min(0xFF) as u8,
            Stat::Luck => self.luck = value.min(0xFF) as u8,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Spell {
    pub index: u8,
    pub name: [u8; NAME_LEN],
    pub cost: u8,
    pub element: u8,
}

impl Spell {
    fn read(rom: &Rom, index: usize) -> Spell {
        let base = SPELL_BASE + index * SPELL_SIZE;
        let mut name = [0u8; NAME_LEN];
        name.copy_from_slice(&rom.bytes[base..base + NAME_LEN]);
        Spell {
            index: index as u8,
            name,
            cost: rom.read_u8(base + 8),
            element: rom.read_u8(base + 9),
        }
    }

    fn write(&self, rom: &mut Rom) {
        let base = SPELL_BASE + self.index as usize * SPELL_SIZE;
        rom.write_bytes(base, &self.name);
        rom.write_u8(base + 8, self.cost as u32);
        rom.write_u8(base + 9, self.element as u32);
    }

    pub fn display_name(&self) -> String {
        display_name(&self.name)
    }
}

/// One character's ordered (level, spell) learn list.
#[derive(Clone, Debug)]
pub struct LearnList {
    pub index: u8,
    pub pairs: Vec<(u8, u8)>,
}

impl LearnList {
    pub fn sort_pairs(&mut self) {
        self.pairs.sort_by_key(|&(level, _)| level);
    }
}

fn read_learn_lists(rom: &Rom) -> Result<Vec<LearnList>> {
    let mut lists = Vec::with_capacity(CHARACTER_COUNT);
    for i in 0..CHARACTER_COUNT {
        let sub = rom.read_u16(LEARN_BASE + 2 * i) as usize;
        let mut pointer = LEARN_BASE + sub;
        if pointer >= LEARN_END {
            return Err(RandomizerError::Config(format!(
                "learn list {} points outside its region",
                i
            )));
        }
        let mut pairs = Vec::new();
        while pointer + 1 < LEARN_END {
            let level = rom.read_u8(pointer);
            if level == 0 {
                break;
            }
            pairs.push((level, rom.read_u8(pointer + 1)));
            pointer += 2;
        }
        lists.push(LearnList {
            index: i as u8,
            pairs,
        });
    }
    Ok(lists)
}

fn write_learn_lists(rom: &mut Rom, lists: &[LearnList], log: &mut String) {
    let mut pointer = LEARN_BASE + 2 * CHARACTER_COUNT;
    for list in lists {
        let sub = (pointer - LEARN_BASE) as u32;
        rom.write_u16(LEARN_BASE + 2 * list.index as usize, sub);
        for &(level, spell) in &list.pairs {
            // Keep room for this list's terminator and the remaining lists'.
            if pointer + 2 >= LEARN_END {
                log.push_str(&format!(
                    "learn list {}: overflow, remaining spells cut\n",
                    list.index
                ));
                break;
            }
            rom.write_u8(pointer, level as u32);
            rom.write_u8(pointer + 1, spell as u32);
            pointer += 2;
        }
        rom.write_u8(pointer, 0);
        pointer += 1;
    }
}

/// A sparse initially-known-ability slot. The address field packs the owner
/// and the slot position; `value` is the learned spell.
#[derive(Clone, Debug)]
pub struct InitialSlot {
    pub index: u8,
    pub addr: u16,
    pub value: u8,
}

impl InitialSlot {
    fn read(rom: &Rom, index: usize) -> InitialSlot {
        let base = INITIAL_BASE + index * INITIAL_SIZE;
        InitialSlot {
            index: index as u8,
            addr: rom.read_u16(base),
            value: rom.read_u8(base + 2),
        }
    }

    fn write(&self, rom: &mut Rom) {
        let base = INITIAL_BASE + self.index as usize * INITIAL_SIZE;
        rom.write_u16(base, self.addr as u32);
        rom.write_u8(base + 2, self.value as u32);
    }

    pub fn is_learned_spell(&self) -> bool {
        (0x5400..=0x5540).contains(&self.addr)
    }

    pub fn char_id(&self) -> Option<usize> {
        if !self.is_learned_spell() {
            return None;
        }
        let raw = (self.addr >> 5) & 0xF;
        if raw == 0 {
            None
        } else {
            Some(raw as usize - 1)
        }
    }

    pub fn set_char(&mut self, char_id: usize) {
        let packed = (char_id as u16 + 1) << 5;
        self.addr = (self.addr & 0xFE1F) | packed;
    }

    pub fn set_slot(&mut self, slot: u16) {
        debug_assert_eq!(slot, slot & 0x1F);
        self.addr = (self.addr & !0x1F) | (slot & 0x1F);
    }
}

/// Variable-length shop inventory; a zero byte terminates each shop and the
/// next shop starts immediately after.
#[derive(Clone, Debug)]
pub struct Shop {
    pub index: u8,
    pub(crate) pointer: usize,
    pub contents: Vec<u8>,
}

const SHOP_SANITY_LIMIT: usize = 1000;

fn read_shops(rom: &Rom) -> Result<Vec<Shop>> {
    let mut shops = Vec::new();
    let mut pointer = SHOP_BASE;
    for index in 0..SHOP_SANITY_LIMIT {
        let mut contents = Vec::new();
        let mut cursor = pointer;
        loop {
            if cursor > SHOP_MAX {
                return Err(RandomizerError::Config(format!(
                    "shop {} overruns the shop region at {:#X}",
                    index, cursor
                )));
            }
            let value = rom.read_u8(cursor);
            if value == 0 {
                break;
            }
            contents.push(value);
            cursor += 1;
        }
        shops.push(Shop {
            index: index as u8,
            pointer,
            contents,
        });
        pointer = cursor + 1;
        if pointer > SHOP_MAX {
            return Ok(shops);
        }
    }
    Err(RandomizerError::Config(
        "shop region never terminates".to_string(),
    ))
}

impl Shop {
    fn write(&self, rom: &mut Rom) {
        // Inventory length is fixed at load; only the contents change.
        rom.write_bytes(self.pointer, &self.contents);
    }
}

/// An encounter zone: the eight formation slots a map area draws battles
/// from. Slots may repeat; the distinct set defines what can appear there.
#[derive(Clone, Debug)]
pub struct Zone {
    pub index: u8,
    pub formation_indexes: [u8; ZONE_FORMATIONS],
}

impl Zone {
    fn read(rom: &Rom, index: usize) -> Zone {
        let base = ZONE_BASE + index * ZONE_FORMATIONS;
        let mut formation_indexes = [0u8; ZONE_FORMATIONS];
        formation_indexes.copy_from_slice(&rom.bytes[base..base + ZONE_FORMATIONS]);
        Zone {
            index: index as u8,
            formation_indexes,
        }
    }

    fn write(&self, rom: &mut Rom) {
        let base = ZONE_BASE + self.index as usize * ZONE_FORMATIONS;
        rom.write_bytes(base, &self.formation_indexes);
    }
}

/// A field treasure chest. Chests at the same map address share contents.
#[derive(Clone, Debug)]
pub struct Chest {
    pub index: u8,
    pub addr: u16,
    pub contents: u8,
    pub qty: u8,
}

impl Chest {
    fn read(rom: &Rom, index: usize) -> Chest {
        let base = CHEST_BASE + index * CHEST_SIZE;
        Chest {
            index: index as u8,
            addr: rom.read_u16(base),
            contents: rom.read_u8(base + 2),
            qty: rom.read_u8(base + 3),
        }
    }

    fn write(&self, rom: &mut Rom) {
        let base = CHEST_BASE + self.index as usize * CHEST_SIZE;
        rom.write_u16(base, self.addr as u32);
        rom.write_u8(base + 2, self.contents as u32);
        rom.write_u8(base + 3, self.qty as u32);
    }
}

/// All loaded record tables plus the ROM image they came from.
#[derive(Debug)]
pub struct Tables {
    pub rom: Rom,
    pub items: Vec<Item>,
    pub monsters: Vec<Monster>,
    pub drops: Vec<DropTable>,
    pub fusions: Vec<Fusion>,
    pub combos: Vec<ComboSlots>,
    pub characters: Vec<Character>,
    pub curves: Vec<LevelCurve>,
    pub spells: Vec<Spell>,
    pub learn_lists: Vec<LearnList>,
    pub initial_slots: Vec<InitialSlot>,
    pub shops: Vec<Shop>,
    pub zones: Vec<Zone>,
    pub chests: Vec<Chest>,
}

impl Tables {
    pub fn load(rom: Rom) -> Result<Tables> {
        let items = (0..ITEM_COUNT).map(|i| Item::read(&rom, i)).collect();
        let monsters = (0..MONSTER_COUNT).map(|i| Monster::read(&rom, i)).collect();
        let drops = (0..DROP_COUNT).map(|i| DropTable::read(&rom, i)).collect();
        let fusions = (0..FUSION_COUNT).map(|i| Fusion::read(&rom, i)).collect();
        let combos = (0..COMBO_OWNER_COUNT)
            .map(|i| ComboSlots::read(&rom, i))
            .collect();
        let characters = (0..CHARACTER_COUNT)
            .map(|i| Character::read(&rom, i))
            .collect();
        let curves = (0..CHARACTER_COUNT)
            .map(|i| LevelCurve::read(&rom, i))
            .collect();
        let spells = (0..SPELL_COUNT).map(|i| Spell::read(&rom, i)).collect();
        let learn_lists = read_learn_lists(&rom)?;
        let initial_slots = (0..INITIAL_COUNT)
            .map(|i| InitialSlot::read(&rom, i))
            .collect();
        let shops = read_shops(&rom)?;
        let zones = (0..ZONE_COUNT).map(|i| Zone::read(&rom, i)).collect();
        let chests = (0..CHEST_COUNT).map(|i| Chest::read(&rom, i)).collect();
        Ok(Tables {
            rom,
            items,
            monsters,
            drops,
            fusions,
            combos,
            characters,
            curves,
            spells,
            learn_lists,
            initial_slots,
            shops,
            zones,
            chests,
        })
    }

    /// Flushes every record back to its fixed offset in the image.
    pub fn persist(&mut self, log: &mut String) {
        for item in &self.items {
            item.write(&mut self.rom);
        }
        for monster in &self.monsters {
            monster.write(&mut self.rom);
        }
        for drop in &self.drops {
            drop.write(&mut self.rom);
        }
        for fusion in &self.fusions {
            fusion.write(&mut self.rom);
        }
        for combo in &self.combos {
            combo.write(&mut self.rom);
        }
        for character in &self.characters {
            character.write(&mut self.rom);
        }
        for curve in &self.curves {
            curve.write(&mut self.rom);
        }
        for spell in &self.spells {
            spell.write(&mut self.rom);
        }
        write_learn_lists(&mut self.rom, &self.learn_lists, log);
        for slot in &self.initial_slots {
            slot.write(&mut self.rom);
        }
        for shop in &self.shops {
            shop.write(&mut self.rom);
        }
        for zone in &self.zones {
            zone.write(&mut self.rom);
        }
        for chest in &self.chests {
            chest.write(&mut self.rom);
        }
    }
}
