//! Combat stats and stat modifiers.
//!
//! [`Stats`] is a fixed record of combat attributes. Every write path goes
//! through [`Stats::clamp`], so values always sit inside their documented
//! ranges no matter how many modifiers stack up.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_decimal, fixed_serde, ratio, Fixed};

/// Upper bound for cooldown reduction.
pub fn max_cdr() -> Fixed {
    ratio(4, 5)
}

/// Upper bound for evasion.
pub fn max_evasion() -> Fixed {
    ratio(3, 4)
}

/// Lower bound for attack speed (attacks per second).
pub fn min_attack_speed() -> Fixed {
    ratio(1, 10)
}

/// Numeric combat attributes of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stats {
    /// Current hit points, in `[0, max_hp]`.
    #[serde(with = "fixed_serde")]
    pub hp: Fixed,
    /// Maximum hit points, at least 1.
    #[serde(with = "fixed_serde")]
    pub max_hp: Fixed,
    /// Attack damage.
    #[serde(with = "fixed_serde")]
    pub attack: Fixed,
    /// Physical damage reduction.
    #[serde(with = "fixed_serde")]
    pub armor: Fixed,
    /// Magic damage reduction.
    #[serde(with = "fixed_serde")]
    pub resistance: Fixed,
    /// Attacks per second.
    #[serde(with = "fixed_serde")]
    pub attack_speed: Fixed,
    /// Probability of a critical hit, `[0, 1]`.
    #[serde(with = "fixed_serde")]
    pub crit_chance: Fixed,
    /// Damage multiplier on a critical hit, at least 1.
    #[serde(with = "fixed_serde")]
    pub crit_multiplier: Fixed,
    /// Magic damage bonus.
    #[serde(with = "fixed_serde")]
    pub power: Fixed,
    /// Cooldown reduction, `[0, 0.8]`.
    #[serde(with = "fixed_serde")]
    pub cdr: Fixed,
    /// Fraction of dealt damage healed back, `[0, 1]`.
    #[serde(with = "fixed_serde")]
    pub lifesteal: Fixed,
    /// Probability of dodging an attack, `[0, 0.75]`.
    #[serde(with = "fixed_serde")]
    pub evasion: Fixed,
}

impl Stats {
    /// Stats a new player starts a run with.
    #[must_use]
    pub fn player_default() -> Self {
        Self {
            hp: Fixed::from_num(150),
            max_hp: Fixed::from_num(150),
            attack: Fixed::from_num(15),
            armor: Fixed::from_num(8),
            resistance: Fixed::from_num(8),
            attack_speed: ratio(6, 5),
            crit_chance: ratio(1, 10),
            crit_multiplier: ratio(7, 4),
            power: Fixed::ZERO,
            cdr: Fixed::ZERO,
            lifesteal: ratio(1, 20),
            evasion: ratio(3, 100),
        }
    }

    /// Minimal stats: 1 HP, no offense, one attack per second.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            hp: Fixed::ONE,
            max_hp: Fixed::ONE,
            attack: Fixed::ZERO,
            armor: Fixed::ZERO,
            resistance: Fixed::ZERO,
            attack_speed: Fixed::ONE,
            crit_chance: Fixed::ZERO,
            crit_multiplier: Fixed::ONE,
            power: Fixed::ZERO,
            cdr: Fixed::ZERO,
            lifesteal: Fixed::ZERO,
            evasion: Fixed::ZERO,
        }
    }

    /// Builder: set both current and maximum HP.
    #[must_use]
    pub fn with_hp(mut self, hp: i32) -> Self {
        self.max_hp = Fixed::from_num(hp);
        self.hp = self.max_hp;
        self.clamped()
    }

    /// Builder: set attack damage.
    #[must_use]
    pub fn with_attack(mut self, attack: i32) -> Self {
        self.attack = Fixed::from_num(attack);
        self.clamped()
    }

    /// Builder: set armor.
    #[must_use]
    pub fn with_armor(mut self, armor: i32) -> Self {
        self.armor = Fixed::from_num(armor);
        self.clamped()
    }

    /// Builder: set attack speed.
    #[must_use]
    pub fn with_attack_speed(mut self, attack_speed: Fixed) -> Self {
        self.attack_speed = attack_speed;
        self.clamped()
    }

    /// Current HP as a fraction of max HP.
    #[must_use]
    pub fn hp_fraction(&self) -> Fixed {
        if self.max_hp <= Fixed::ZERO {
            return Fixed::ZERO;
        }
        self.hp / self.max_hp
    }

    /// Clamp every attribute into its documented range.
    pub fn clamp(&mut self) {
        self.max_hp = self.max_hp.max(Fixed::ONE);
        self.hp = self.hp.clamp(Fixed::ZERO, self.max_hp);
        self.attack = self.attack.max(Fixed::ZERO);
        self.armor = self.armor.max(Fixed::ZERO);
        self.resistance = self.resistance.max(Fixed::ZERO);
        self.attack_speed = self.attack_speed.max(min_attack_speed());
        self.crit_chance = self.crit_chance.clamp(Fixed::ZERO, Fixed::ONE);
        self.crit_multiplier = self.crit_multiplier.max(Fixed::ONE);
        self.power = self.power.max(Fixed::ZERO);
        self.cdr = self.cdr.clamp(Fixed::ZERO, max_cdr());
        self.lifesteal = self.lifesteal.clamp(Fixed::ZERO, Fixed::ONE);
        self.evasion = self.evasion.clamp(Fixed::ZERO, max_evasion());
    }

    /// Return a clamped copy.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.clamp();
        self
    }

    /// Apply flat then percentage modifiers, then clamp.
    #[must_use]
    pub fn apply_modifiers(&self, modifiers: &StatModifiers) -> Self {
        let mut result = *self;

        result.hp += modifiers.hp;
        result.max_hp += modifiers.max_hp;
        result.attack += modifiers.attack;
        result.armor += modifiers.armor;
        result.resistance += modifiers.resistance;
        result.attack_speed += modifiers.attack_speed;
        result.crit_chance += modifiers.crit_chance;
        result.crit_multiplier += modifiers.crit_multiplier;
        result.power += modifiers.power;
        result.cdr += modifiers.cdr;
        result.lifesteal += modifiers.lifesteal;
        result.evasion += modifiers.evasion;

        result.max_hp *= Fixed::ONE + modifiers.max_hp_percent;
        result.attack *= Fixed::ONE + modifiers.attack_percent;
        result.armor *= Fixed::ONE + modifiers.armor_percent;
        result.attack_speed *= Fixed::ONE + modifiers.attack_speed_percent;

        result.clamp();
        result
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::player_default()
    }
}

/// Additive and multiplicative adjustments to [`Stats`].
///
/// All fields default to zero, so content only lists what it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatModifiers {
    /// Flat current HP.
    #[serde(with = "fixed_decimal")]
    pub hp: Fixed,
    /// Flat max HP.
    #[serde(with = "fixed_decimal")]
    pub max_hp: Fixed,
    /// Flat attack.
    #[serde(with = "fixed_decimal")]
    pub attack: Fixed,
    /// Flat armor.
    #[serde(with = "fixed_decimal")]
    pub armor: Fixed,
    /// Flat resistance.
    #[serde(with = "fixed_decimal")]
    pub resistance: Fixed,
    /// Flat attack speed.
    #[serde(with = "fixed_decimal")]
    pub attack_speed: Fixed,
    /// Flat crit chance.
    #[serde(with = "fixed_decimal")]
    pub crit_chance: Fixed,
    /// Flat crit multiplier.
    #[serde(with = "fixed_decimal")]
    pub crit_multiplier: Fixed,
    /// Flat power.
    #[serde(with = "fixed_decimal")]
    pub power: Fixed,
    /// Flat cooldown reduction.
    #[serde(with = "fixed_decimal")]
    pub cdr: Fixed,
    /// Flat lifesteal.
    #[serde(with = "fixed_decimal")]
    pub lifesteal: Fixed,
    /// Flat evasion.
    #[serde(with = "fixed_decimal")]
    pub evasion: Fixed,
    /// Max HP multiplier, `0.1` = +10%.
    #[serde(with = "fixed_decimal")]
    pub max_hp_percent: Fixed,
    /// Attack multiplier.
    #[serde(with = "fixed_decimal")]
    pub attack_percent: Fixed,
    /// Armor multiplier.
    #[serde(with = "fixed_decimal")]
    pub armor_percent: Fixed,
    /// Attack speed multiplier.
    #[serde(with = "fixed_decimal")]
    pub attack_speed_percent: Fixed,
}

impl StatModifiers {
    /// Sum two modifier sets field by field.
    #[must_use]
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            hp: self.hp + other.hp,
            max_hp: self.max_hp + other.max_hp,
            attack: self.attack + other.attack,
            armor: self.armor + other.armor,
            resistance: self.resistance + other.resistance,
            attack_speed: self.attack_speed + other.attack_speed,
            crit_chance: self.crit_chance + other.crit_chance,
            crit_multiplier: self.crit_multiplier + other.crit_multiplier,
            power: self.power + other.power,
            cdr: self.cdr + other.cdr,
            lifesteal: self.lifesteal + other.lifesteal,
            evasion: self.evasion + other.evasion,
            max_hp_percent: self.max_hp_percent + other.max_hp_percent,
            attack_percent: self.attack_percent + other.attack_percent,
            armor_percent: self.armor_percent + other.armor_percent,
            attack_speed_percent: self.attack_speed_percent + other.attack_speed_percent,
        }
    }

    /// Multiply every field by an integer count (e.g. skill points).
    #[must_use]
    pub fn scaled(&self, count: u32) -> Self {
        let n = Fixed::from_num(count);
        Self {
            hp: self.hp * n,
            max_hp: self.max_hp * n,
            attack: self.attack * n,
            armor: self.armor * n,
            resistance: self.resistance * n,
            attack_speed: self.attack_speed * n,
            crit_chance: self.crit_chance * n,
            crit_multiplier: self.crit_multiplier * n,
            power: self.power * n,
            cdr: self.cdr * n,
            lifesteal: self.lifesteal * n,
            evasion: self.evasion * n,
            max_hp_percent: self.max_hp_percent * n,
            attack_percent: self.attack_percent * n,
            armor_percent: self.armor_percent * n,
            attack_speed_percent: self.attack_speed_percent * n,
        }
    }
}
