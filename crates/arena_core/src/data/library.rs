//! The validated content set a run reads from.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::build_data::{ItemData, PerkData, RelicData, SkillData};
use super::enemy_data::{AffixData, BossData, EnemyData};
use super::wave_data::WaveData;
use crate::effects::EffectGrant;
use crate::error::{Result, SimError};
use crate::math::Fixed;

/// Every record family a run needs.
///
/// Loaded once by a content loader and shared read-only between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentLibrary {
    /// Skill tree nodes.
    #[serde(default)]
    pub skills: Vec<SkillData>,
    /// Perks.
    #[serde(default)]
    pub perks: Vec<PerkData>,
    /// Items.
    #[serde(default)]
    pub items: Vec<ItemData>,
    /// Starting relics.
    #[serde(default)]
    pub relics: Vec<RelicData>,
    /// Regular enemy templates.
    #[serde(default)]
    pub enemies: Vec<EnemyData>,
    /// Boss templates.
    #[serde(default)]
    pub bosses: Vec<BossData>,
    /// Elite affixes.
    #[serde(default)]
    pub affixes: Vec<AffixData>,
    /// Waves, in any order.
    #[serde(default)]
    pub waves: Vec<WaveData>,
}

impl ContentLibrary {
    /// Get a skill by id.
    #[must_use]
    pub fn get_skill(&self, id: &str) -> Option<&SkillData> {
        self.skills.iter().find(|s| s.id == id)
    }

    /// Get a perk by id.
    #[must_use]
    pub fn get_perk(&self, id: &str) -> Option<&PerkData> {
        self.perks.iter().find(|p| p.id == id)
    }

    /// Get an item by id.
    #[must_use]
    pub fn get_item(&self, id: &str) -> Option<&ItemData> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Get a relic by id.
    #[must_use]
    pub fn get_relic(&self, id: &str) -> Option<&RelicData> {
        self.relics.iter().find(|r| r.id == id)
    }

    /// Get an enemy template by id.
    #[must_use]
    pub fn get_enemy(&self, id: &str) -> Option<&EnemyData> {
        self.enemies.iter().find(|e| e.id == id)
    }

    /// Get a boss template by id.
    #[must_use]
    pub fn get_boss(&self, id: &str) -> Option<&BossData> {
        self.bosses.iter().find(|b| b.id == id)
    }

    /// Get an affix by id.
    #[must_use]
    pub fn get_affix(&self, id: &str) -> Option<&AffixData> {
        self.affixes.iter().find(|a| a.id == id)
    }

    /// Get a wave by number.
    #[must_use]
    pub fn get_wave(&self, number: u32) -> Option<&WaveData> {
        self.waves.iter().find(|w| w.number == number)
    }

    /// Number of waves in a run.
    #[must_use]
    pub fn max_waves(&self) -> u32 {
        u32::try_from(self.waves.len()).unwrap_or(u32::MAX)
    }

    /// Merge another library into this one, appending every record.
    pub fn extend(&mut self, other: Self) {
        self.skills.extend(other.skills);
        self.perks.extend(other.perks);
        self.items.extend(other.items);
        self.relics.extend(other.relics);
        self.enemies.extend(other.enemies);
        self.bosses.extend(other.bosses);
        self.affixes.extend(other.affixes);
        self.waves.extend(other.waves);
    }

    /// Validate, returning `self` or every problem found.
    ///
    /// # Errors
    /// Returns [`SimError::InvalidContent`] listing all problems.
    pub fn validated(self) -> Result<Self> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(SimError::InvalidContent(errors))
        }
    }

    /// Validate cross-references and value ranges.
    ///
    /// Returns a list of validation errors, empty if valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        check_unique("skill", self.skills.iter().map(|s| s.id.as_str()), &mut errors);
        check_unique("perk", self.perks.iter().map(|p| p.id.as_str()), &mut errors);
        check_unique("item", self.items.iter().map(|i| i.id.as_str()), &mut errors);
        check_unique("relic", self.relics.iter().map(|r| r.id.as_str()), &mut errors);
        check_unique("enemy", self.enemies.iter().map(|e| e.id.as_str()), &mut errors);
        check_unique("boss", self.bosses.iter().map(|b| b.id.as_str()), &mut errors);
        check_unique("affix", self.affixes.iter().map(|a| a.id.as_str()), &mut errors);

        // Skill tree
        for skill in &self.skills {
            if skill.max_points == 0 {
                errors.push(format!("Skill '{}' has max_points 0", skill.id));
            }
            if !(1..=5).contains(&skill.tier) {
                errors.push(format!("Skill '{}' has tier {} outside 1-5", skill.id, skill.tier));
            }
            for prereq in &skill.prerequisites {
                if prereq == &skill.id {
                    errors.push(format!("Skill '{}' requires itself", skill.id));
                } else if self.get_skill(prereq).is_none() {
                    errors.push(format!(
                        "Skill '{}' has unknown prerequisite '{}'",
                        skill.id, prereq
                    ));
                }
            }
            check_grants(&format!("Skill '{}'", skill.id), &skill.grants, &mut errors);
        }

        for perk in &self.perks {
            check_grants(&format!("Perk '{}'", perk.id), &perk.grants, &mut errors);
        }
        for item in &self.items {
            check_grants(&format!("Item '{}'", item.id), &item.grants, &mut errors);
        }
        for relic in &self.relics {
            check_grants(&format!("Relic '{}'", relic.id), &relic.grants, &mut errors);
        }
        for affix in &self.affixes {
            check_grants(&format!("Affix '{}'", affix.id), &affix.grants, &mut errors);
        }

        // Combatants
        for enemy in &self.enemies {
            errors.extend(enemy.stats.validate(&enemy.id));
            check_grants(&format!("Enemy '{}'", enemy.id), &enemy.grants, &mut errors);
        }
        for boss in &self.bosses {
            errors.extend(boss.stats.validate(&boss.id));
            errors.extend(boss.validate_phases());
            check_grants(&format!("Boss '{}'", boss.id), &boss.grants, &mut errors);
        }

        // Waves
        if self.waves.is_empty() {
            errors.push("No waves defined".to_string());
        }
        let numbers: BTreeSet<u32> = self.waves.iter().map(|w| w.number).collect();
        if numbers.len() != self.waves.len() {
            errors.push("Wave numbers are not unique".to_string());
        }
        if !numbers.is_empty() && numbers.iter().copied().ne(1..=self.max_waves()) {
            errors.push("Wave numbers must run from 1 without gaps".to_string());
        }

        for wave in &self.waves {
            if wave.enemy_count() == 0 {
                errors.push(format!("Wave {} has no enemies", wave.number));
            }
            for spawn in &wave.enemies {
                if self.get_enemy(&spawn.template).is_none() {
                    errors.push(format!(
                        "Wave {} spawns unknown enemy '{}'",
                        wave.number, spawn.template
                    ));
                }
                if spawn.elite && spawn.affix_count as usize > self.affixes.len() {
                    errors.push(format!(
                        "Wave {} asks for {} affixes but only {} exist",
                        wave.number,
                        spawn.affix_count,
                        self.affixes.len()
                    ));
                }
            }
            if let Some(boss) = &wave.boss {
                if self.get_boss(boss).is_none() {
                    errors.push(format!("Wave {} has unknown boss '{}'", wave.number, boss));
                }
            }
            let chance = wave.rewards.item_drop_chance;
            if chance < Fixed::ZERO || chance > Fixed::ONE {
                errors.push(format!(
                    "Wave {} item_drop_chance outside [0, 1]",
                    wave.number
                ));
            }
        }

        errors
    }
}

fn check_unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>, errors: &mut Vec<String>) {
    let mut seen = BTreeSet::new();
    for id in ids {
        if id.is_empty() {
            errors.push(format!("A {kind} has an empty id"));
        } else if !seen.insert(id) {
            errors.push(format!("Duplicate {kind} id '{id}'"));
        }
    }
}

fn check_grants(owner: &str, grants: &[EffectGrant], errors: &mut Vec<String>) {
    for grant in grants {
        match *grant {
            EffectGrant::OnHit {
                chance,
                duration_ticks,
                stacks,
                ..
            } => {
                if chance < Fixed::ZERO || chance > Fixed::ONE {
                    errors.push(format!("{owner} has an on-hit chance outside [0, 1]"));
                }
                if duration_ticks == 0 || stacks == 0 {
                    errors.push(format!("{owner} has an on-hit grant with no effect"));
                }
            }
            EffectGrant::OpeningShield {
                amount,
                duration_ticks,
            } => {
                if amount == 0 || duration_ticks == 0 {
                    errors.push(format!("{owner} has an empty opening shield"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SkillBranch, StatBlock, WaveRewards, WaveSpawn};
    use crate::effects::OnHitStatus;
    use crate::stats::StatModifiers;

    fn slime() -> EnemyData {
        EnemyData {
            id: "slime".into(),
            name: "Slime".into(),
            stats: StatBlock {
                max_hp: Fixed::from_num(30),
                attack: Fixed::from_num(5),
                armor: Fixed::ZERO,
                resistance: Fixed::ZERO,
                attack_speed: Fixed::ONE,
                crit_chance: Fixed::ZERO,
                crit_multiplier: Fixed::ONE,
                power: Fixed::ZERO,
                cdr: Fixed::ZERO,
                lifesteal: Fixed::ZERO,
                evasion: Fixed::ZERO,
            },
            xp_reward: 5,
            gold_reward: 2,
            grants: vec![],
            tags: vec![],
        }
    }

    fn wave(number: u32, template: &str) -> WaveData {
        WaveData {
            number,
            name: format!("Wave {number}"),
            enemies: vec![WaveSpawn {
                template: template.into(),
                count: 2,
                elite: false,
                affix_count: 0,
            }],
            boss: None,
            rewards: WaveRewards {
                xp: 20,
                gold: 10,
                item_drop_chance: Fixed::ZERO,
            },
        }
    }

    fn library() -> ContentLibrary {
        ContentLibrary {
            enemies: vec![slime()],
            waves: vec![wave(1, "slime"), wave(2, "slime")],
            ..ContentLibrary::default()
        }
    }

    #[test]
    fn test_valid_library() {
        let content = library();
        assert!(content.validate().is_empty());
        assert_eq!(content.max_waves(), 2);
        assert!(content.get_wave(2).is_some());
        assert!(content.get_enemy("slime").is_some());
        assert!(content.clone().validated().is_ok());
    }

    #[test]
    fn test_unknown_references_reported() {
        let mut content = library();
        content.waves.push(wave(3, "ghost"));
        content.waves[0].boss = Some("lich".into());
        content.skills.push(SkillData {
            id: "cleave".into(),
            name: "Cleave".into(),
            description: String::new(),
            branch: SkillBranch::BladeDance,
            tier: 1,
            max_points: 1,
            prerequisites: vec!["missing".into()],
            modifiers: StatModifiers::default(),
            grants: vec![],
            keystone: None,
        });

        let errors = content.validate();
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("ghost")));
        assert!(errors.iter().any(|e| e.contains("lich")));
        assert!(errors.iter().any(|e| e.contains("missing")));
    }

    #[test]
    fn test_wave_gaps_and_empty_waves() {
        let mut content = library();
        content.waves[1].number = 4;
        content.waves[0].enemies.clear();

        let errors = content.validate();
        assert!(errors.iter().any(|e| e.contains("without gaps")));
        assert!(errors.iter().any(|e| e.contains("no enemies")));
    }

    #[test]
    fn test_duplicates_and_bad_grants() {
        let mut content = library();
        let mut twin = slime();
        twin.grants.push(EffectGrant::OnHit {
            status: OnHitStatus::Poison,
            chance: Fixed::from_num(2),
            stacks: 1,
            magnitude: Fixed::ONE,
            duration_ticks: 60,
        });
        content.enemies.push(twin);

        let errors = content.validate();
        assert!(errors.iter().any(|e| e.contains("Duplicate enemy id 'slime'")));
        assert!(errors.iter().any(|e| e.contains("on-hit chance")));
        assert!(matches!(
            content.validated(),
            Err(SimError::InvalidContent(list)) if list.len() == 2
        ));
    }

    #[test]
    fn test_empty_library_has_no_waves() {
        let errors = ContentLibrary::default().validate();
        assert_eq!(errors, vec!["No waves defined".to_string()]);
    }
}
