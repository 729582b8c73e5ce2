//! Run and wave progression.
//!
//! A run is a fixed sequence of waves. Between waves the player sits in
//! an intermission and may commit one build choice. The manager owns the
//! persistent [`RunState`] and, during a wave, the transient
//! [`CombatSession`].
//!
//! ```text
//!              start_wave                 all enemies dead
//! Intermission ----------> Combat ----------------------------> Intermission
//!                            |  \        last wave cleared
//!                            |   `---------------------------> Victory
//!                            |   player dead or timeout
//!                            `-------------------------------> GameOver
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::data::{ContentLibrary, WaveData};
use crate::effects::EffectGrant;
use crate::entity::{Enemy, Entity, EntityId, EquippedItem, Player};
use crate::error::{Result, SimError};
use crate::events::{chain_hash, CombatEvent, CombatEventKind};
use crate::keystones::KeystoneId;
use crate::rng::SeededRng;
use crate::simulation::{CombatSession, CombatState, Winner};
use crate::stats::{StatModifiers, Stats};

/// Display name of the player character.
const PLAYER_NAME: &str = "Hero";

/// Run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    /// Between waves; choices may be pending.
    Intermission,
    /// A wave is being fought.
    Combat,
    /// The player lost. Terminal.
    GameOver,
    /// Every wave was cleared. Terminal.
    Victory,
}

impl RunPhase {
    /// Whether no further progress is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::GameOver | Self::Victory)
    }
}

/// Kind of build choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceKind {
    /// Spend a skill point on one of the offered skills.
    SkillAllocation,
    /// Take one of the offered perks.
    Perk,
    /// Equip one of the offered items.
    Item,
}

/// One choice offered during an intermission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Choice {
    /// What committing does.
    pub kind: ChoiceKind,
    /// Record ids offered.
    pub options: Vec<String>,
}

/// Run-level events, interleaved with combat events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunEvent {
    /// A wave began.
    WaveStarted {
        /// Wave number.
        wave: u32,
        /// Enemies spawned.
        enemies: u32,
        /// Whether a boss spawned.
        boss: bool,
    },
    /// A wave was won.
    WaveCleared {
        /// Wave number.
        wave: u32,
        /// Experience granted, wave basis plus kills.
        xp: u32,
        /// Currency granted, wave basis plus kills.
        gold: u32,
        /// Ticks the wave took.
        ticks: u64,
    },
    /// The player gained a level.
    LevelUp {
        /// New level.
        level: u32,
        /// HP restored.
        healed: u32,
        /// Unspent skill points afterwards.
        skill_points: u32,
    },
    /// Choices were offered.
    ChoicesOffered {
        /// Number of choices.
        count: u32,
        /// Whether the item choice was forced by the pity timer.
        item_forced: bool,
    },
    /// A choice was committed.
    ChoiceCommitted {
        /// Choice kind.
        kind: ChoiceKind,
        /// Record id taken.
        option: String,
    },
    /// The run ended.
    RunEnded {
        /// Whether every wave was cleared.
        victory: bool,
        /// Waves cleared.
        waves_cleared: u32,
    },
}

/// Persistent state of a run.
///
/// Serializes with bincode; the combat in progress is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunState {
    /// Seed the run started from.
    pub seed: u32,
    /// Run-level random stream. Each wave forks its combat stream from it.
    pub rng: SeededRng,
    /// Lifecycle state.
    pub phase: RunPhase,
    /// Last wave started, 0 before the first.
    pub current_wave: u32,
    /// Waves in the run.
    pub max_waves: u32,
    /// The persistent player.
    pub player: Player,
    /// Starting relic.
    pub relic: Option<String>,
    /// Cleared wave numbers.
    pub completed_waves: Vec<u32>,
    /// Item ids taken, in order.
    pub collected_items: Vec<String>,
    /// Perk ids taken, in order.
    pub selected_perks: Vec<String>,
    /// Experience earned.
    pub total_xp: u32,
    /// Currency earned.
    pub total_gold: u32,
    /// Combat ticks simulated.
    pub total_ticks: u64,
    /// Choices awaiting a commit.
    pub pending_choices: Vec<Choice>,
    /// Completed waves since an item choice was last offered.
    pub waves_since_item_offer: u32,
    /// Host-supplied start time.
    pub started_at: Option<u64>,
    /// Host-supplied end time.
    pub ended_at: Option<u64>,
}

impl RunState {
    /// Whether the run has ended.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Whether the run ended in victory.
    #[must_use]
    pub fn is_victory(&self) -> bool {
        self.phase == RunPhase::Victory
    }

    /// Encode with bincode.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SimError::Serialization(format!("Failed to serialize run state: {e}")))
    }

    /// Decode from bincode.
    ///
    /// # Errors
    /// Returns an error if decoding fails.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| SimError::Serialization(format!("Failed to deserialize run state: {e}")))
    }

    /// Digest of the whole state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Events produced by one [`RunManager::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Combat events of this tick.
    pub combat: Vec<CombatEvent>,
    /// Run events triggered by the end of the wave.
    pub run: Vec<RunEvent>,
}

impl TickOutcome {
    /// Total events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.combat.len() + self.run.len()
    }

    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.combat.is_empty() && self.run.is_empty()
    }
}

/// A committed choice, as recorded for replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChoiceRecord {
    /// Wave the intermission followed.
    pub wave: u32,
    /// Index of the choice.
    pub choice_index: usize,
    /// Index of the option within the choice.
    pub option_index: usize,
}

/// Aggregate results of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Seed.
    pub seed: u32,
    /// Starting relic.
    pub relic: Option<String>,
    /// Waves cleared.
    pub waves_cleared: u32,
    /// Waves in the run.
    pub max_waves: u32,
    /// Final level.
    pub level: u32,
    /// Experience earned.
    pub total_xp: u32,
    /// Currency earned.
    pub total_gold: u32,
    /// Combat ticks simulated.
    pub total_ticks: u64,
    /// Events emitted, combat and run.
    pub events_emitted: u64,
    /// Items taken.
    pub items: Vec<String>,
    /// Perks taken.
    pub perks: Vec<String>,
    /// Unlocked keystones.
    pub keystones: Vec<KeystoneId>,
    /// Whether every wave was cleared.
    pub victory: bool,
    /// Digest of every event emitted.
    pub event_log_hash: u64,
}

/// Drives a run: waves, rewards, leveling and choices.
#[derive(Debug, Clone)]
pub struct RunManager {
    content: Arc<ContentLibrary>,
    config: SimConfig,
    state: RunState,
    combat: Option<CombatSession>,
    run_events: Vec<RunEvent>,
    choice_log: Vec<ChoiceRecord>,
    log_hash: u64,
    events_emitted: u64,
}

impl RunManager {
    /// Start a run in the intermission before wave 1.
    ///
    /// # Errors
    /// Returns an error if the config is unusable, the content has no
    /// waves or the relic does not exist.
    pub fn new(
        content: Arc<ContentLibrary>,
        config: SimConfig,
        seed: u32,
        relic: Option<&str>,
    ) -> Result<Self> {
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(SimError::InvalidContent(problems));
        }
        if content.max_waves() == 0 {
            return Err(SimError::InvalidContent(vec!["No waves defined".to_string()]));
        }
        if let Some(relic) = relic {
            if content.get_relic(relic).is_none() {
                return Err(SimError::UnknownRelic(relic.to_string()));
            }
        }

        let mut player = Player::new(
            PLAYER_NAME,
            Stats::player_default(),
            config.xp_to_next_level(1),
        );
        player.relic = relic.map(str::to_string);
        rebuild_player(&content, &mut player);
        player.entity.stats.hp = player.entity.stats.max_hp;

        let state = RunState {
            seed,
            rng: SeededRng::new(seed),
            phase: RunPhase::Intermission,
            current_wave: 0,
            max_waves: content.max_waves(),
            player,
            relic: relic.map(str::to_string),
            completed_waves: Vec::new(),
            collected_items: Vec::new(),
            selected_perks: Vec::new(),
            total_xp: 0,
            total_gold: 0,
            total_ticks: 0,
            pending_choices: Vec::new(),
            waves_since_item_offer: 0,
            started_at: None,
            ended_at: None,
        };

        tracing::debug!(seed, relic = ?state.relic, max_waves = state.max_waves, "Run created");
        Ok(Self::from_state(content, config, state))
    }

    /// Continue a persisted run.
    ///
    /// # Errors
    /// Returns an error if the state references records missing from
    /// `content` or was saved mid-combat.
    pub fn resume(
        content: Arc<ContentLibrary>,
        config: SimConfig,
        state: RunState,
    ) -> Result<Self> {
        if state.phase == RunPhase::Combat {
            return Err(SimError::InvalidState(
                "cannot resume a run saved during combat".to_string(),
            ));
        }
        let player = &state.player;
        if let Some(relic) = &player.relic {
            if content.get_relic(relic).is_none() {
                return Err(SimError::UnknownRelic(relic.clone()));
            }
        }
        for skill in player.allocated_skills.keys() {
            if content.get_skill(skill).is_none() {
                return Err(unknown("skill", skill));
            }
        }
        for perk in &player.perks {
            if content.get_perk(perk).is_none() {
                return Err(unknown("perk", perk));
            }
        }
        for item in &player.items {
            if content.get_item(&item.id).is_none() {
                return Err(unknown("item", &item.id));
            }
        }

        Ok(Self::from_state(content, config, state))
    }

    fn from_state(content: Arc<ContentLibrary>, config: SimConfig, state: RunState) -> Self {
        Self {
            content,
            config,
            state,
            combat: None,
            run_events: Vec::new(),
            choice_log: Vec::new(),
            log_hash: 0,
            events_emitted: 0,
        }
    }

    /// Persistent state.
    #[must_use]
    pub const fn state(&self) -> &RunState {
        &self.state
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> RunPhase {
        self.state.phase
    }

    /// Choices awaiting a commit.
    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        &self.state.pending_choices
    }

    /// The combat in progress.
    #[must_use]
    pub fn combat(&self) -> Option<&CombatState> {
        self.combat.as_ref().map(CombatSession::state)
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Content the run reads from.
    #[must_use]
    pub fn content(&self) -> &ContentLibrary {
        &self.content
    }

    /// Every run event so far.
    #[must_use]
    pub fn run_events(&self) -> &[RunEvent] {
        &self.run_events
    }

    /// Every committed choice so far.
    #[must_use]
    pub fn choice_log(&self) -> &[ChoiceRecord] {
        &self.choice_log
    }

    /// Digest of every combat and run event emitted.
    #[must_use]
    pub const fn event_log_hash(&self) -> u64 {
        self.log_hash
    }

    /// Number of events emitted.
    #[must_use]
    pub const fn events_emitted(&self) -> u64 {
        self.events_emitted
    }

    /// Record a host-supplied start time.
    pub fn mark_started(&mut self, timestamp: u64) {
        self.state.started_at = Some(timestamp);
    }

    /// Record a host-supplied end time.
    pub fn mark_ended(&mut self, timestamp: u64) {
        self.state.ended_at = Some(timestamp);
    }

    /// Begin the next wave.
    ///
    /// Uncommitted choices are discarded. Outside an intermission this is
    /// a no-op. The outcome carries the tick-0 opening shield events and
    /// the `WaveStarted` event.
    ///
    /// # Errors
    /// Returns an error if the wave or one of its templates is missing, or
    /// the wave spawns no enemies.
    pub fn start_wave(&mut self) -> Result<TickOutcome> {
        if self.state.phase != RunPhase::Intermission {
            return Ok(TickOutcome::default());
        }

        let number = self.state.current_wave + 1;
        let content = Arc::clone(&self.content);
        let wave = content.get_wave(number).ok_or(SimError::UnknownWave(number))?;
        let enemies = spawn_wave(&content, wave, &mut self.state.rng)?;
        let combat_rng = self.state.rng.fork();

        let mut player = self.state.player.clone();
        player.entity.reset_for_combat();
        let enemy_count = u32::try_from(enemies.len()).unwrap_or(u32::MAX);
        let combat = CombatState::new(player, enemies)?;
        let opening = combat.events.clone();
        for event in &opening {
            self.record_combat_event(event);
        }

        self.combat = Some(CombatSession::new(combat, combat_rng, self.config.clone()));
        self.state.pending_choices.clear();
        self.state.current_wave = number;
        self.state.phase = RunPhase::Combat;

        tracing::debug!(wave = number, enemies = enemy_count, "Wave started");
        let events = vec![RunEvent::WaveStarted {
            wave: number,
            enemies: enemy_count,
            boss: wave.is_boss_wave(),
        }];
        self.record_run_events(&events);
        Ok(TickOutcome {
            combat: opening,
            run: events,
        })
    }

    /// Advance the current wave by one tick. Outside combat this is a no-op.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(session) = self.combat.as_mut() else {
            return TickOutcome::default();
        };

        let combat = session.tick();
        let winner = session.state().winner();
        for event in &combat {
            self.record_combat_event(event);
        }

        let run = match winner {
            Some(winner) => self.finish_wave(winner),
            None => Vec::new(),
        };
        TickOutcome { combat, run }
    }

    /// Tick until the current wave ends. Returns every event produced.
    pub fn run_wave(&mut self) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        while self.state.phase == RunPhase::Combat {
            let step = self.tick();
            outcome.combat.extend(step.combat);
            outcome.run.extend(step.run);
        }
        outcome
    }

    /// Commit option `option_index` of choice `choice_index`.
    ///
    /// Clears every pending choice. Returns false, changing nothing, when
    /// not in an intermission or either index is out of range.
    pub fn choose(&mut self, choice_index: usize, option_index: usize) -> bool {
        if self.state.phase != RunPhase::Intermission {
            return false;
        }
        let Some(choice) = self.state.pending_choices.get(choice_index) else {
            return false;
        };
        let Some(option) = choice.options.get(option_index).cloned() else {
            return false;
        };
        let kind = choice.kind;

        let player = &mut self.state.player;
        match kind {
            ChoiceKind::SkillAllocation => {
                if player.skill_points == 0 {
                    return false;
                }
                player.skill_points -= 1;
                *player.allocated_skills.entry(option.clone()).or_insert(0) += 1;
            }
            ChoiceKind::Perk => {
                player.perks.push(option.clone());
                self.state.selected_perks.push(option.clone());
            }
            ChoiceKind::Item => {
                let Some(item) = self.content.get_item(&option) else {
                    return false;
                };
                player.equip(EquippedItem {
                    id: item.id.clone(),
                    slot: item.slot,
                });
                self.state.collected_items.push(option.clone());
            }
        }

        rebuild_player(&self.content, &mut self.state.player);
        self.state.pending_choices.clear();
        self.choice_log.push(ChoiceRecord {
            wave: self.state.current_wave,
            choice_index,
            option_index,
        });

        tracing::debug!(?kind, option = %option, "Choice committed");
        self.record_run_events(&[RunEvent::ChoiceCommitted { kind, option }]);
        true
    }

    /// Drive the run to its end.
    ///
    /// `pick` is asked once per intermission with pending choices and
    /// returns the `(choice, option)` to commit, or `None` to skip.
    ///
    /// # Errors
    /// Returns an error if a wave cannot be constructed.
    pub fn play_to_end<F>(&mut self, mut pick: F) -> Result<RunSummary>
    where
        F: FnMut(&RunState) -> Option<(usize, usize)>,
    {
        loop {
            match self.state.phase {
                RunPhase::Intermission => {
                    if !self.state.pending_choices.is_empty() {
                        if let Some((choice, option)) = pick(&self.state) {
                            self.choose(choice, option);
                        }
                    }
                    self.start_wave()?;
                }
                RunPhase::Combat => {
                    self.run_wave();
                }
                RunPhase::GameOver | RunPhase::Victory => return Ok(self.summary()),
            }
        }
    }

    /// Aggregate results so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let state = &self.state;
        RunSummary {
            seed: state.seed,
            relic: state.relic.clone(),
            waves_cleared: u32::try_from(state.completed_waves.len()).unwrap_or(u32::MAX),
            max_waves: state.max_waves,
            level: state.player.level,
            total_xp: state.total_xp,
            total_gold: state.total_gold,
            total_ticks: state.total_ticks,
            events_emitted: self.events_emitted,
            items: state.collected_items.clone(),
            perks: state.selected_perks.clone(),
            keystones: state.player.keystones.clone(),
            victory: state.is_victory(),
            event_log_hash: self.log_hash,
        }
    }

    fn finish_wave(&mut self, winner: Winner) -> Vec<RunEvent> {
        let Some(session) = self.combat.take() else {
            return Vec::new();
        };
        let combat = session.into_state();
        let wave_number = self.state.current_wave;
        self.state.total_ticks += combat.tick;

        let mut player = combat.player;
        player.entity.reset_for_combat();
        self.state.player = player;

        let mut events = Vec::new();
        match winner {
            Winner::Enemies => {
                self.state.phase = RunPhase::GameOver;
                tracing::debug!(wave = wave_number, ticks = combat.tick, "Run lost");
                events.push(self.end_run(false));
            }
            Winner::Player => {
                let (kill_xp, kill_gold) = kill_rewards(&combat.events);
                let basis = self
                    .content
                    .get_wave(wave_number)
                    .map(|wave| wave.rewards);
                let xp = basis.map_or(0, |r| r.xp).saturating_add(kill_xp);
                let gold = basis.map_or(0, |r| r.gold).saturating_add(kill_gold);
                let drop_chance = basis.map(|r| r.item_drop_chance).unwrap_or_default();

                self.state.completed_waves.push(wave_number);
                self.state.total_xp = self.state.total_xp.saturating_add(xp);
                self.state.total_gold = self.state.total_gold.saturating_add(gold);
                self.state.player.gold = self.state.player.gold.saturating_add(gold);
                events.push(RunEvent::WaveCleared {
                    wave: wave_number,
                    xp,
                    gold,
                    ticks: combat.tick,
                });
                events.extend(self.grant_xp(xp));
                tracing::debug!(wave = wave_number, xp, gold, ticks = combat.tick, "Wave cleared");

                if wave_number >= self.state.max_waves {
                    self.state.phase = RunPhase::Victory;
                    events.push(self.end_run(true));
                } else {
                    self.state.phase = RunPhase::Intermission;
                    events.push(self.offer_choices(drop_chance));
                }
            }
        }

        self.record_run_events(&events);
        events
    }

    fn end_run(&self, victory: bool) -> RunEvent {
        RunEvent::RunEnded {
            victory,
            waves_cleared: u32::try_from(self.state.completed_waves.len()).unwrap_or(u32::MAX),
        }
    }

    fn grant_xp(&mut self, xp: u32) -> Vec<RunEvent> {
        let config = &self.config;
        let player = &mut self.state.player;
        player.xp = player.xp.saturating_add(xp);

        let mut events = Vec::new();
        while player.xp >= player.xp_to_next_level {
            player.xp -= player.xp_to_next_level;
            player.level += 1;
            player.xp_to_next_level = config.xp_to_next_level(player.level);
            player.skill_points = player
                .skill_points
                .saturating_add(config.skill_points_per_level);

            let amount = config.level_up_heal_amount(player.entity.stats.max_hp);
            let healed = crate::combat::apply_healing(&mut player.entity, amount);
            events.push(RunEvent::LevelUp {
                level: player.level,
                healed,
                skill_points: player.skill_points,
            });
        }
        events
    }

    fn offer_choices(&mut self, item_drop_chance: crate::math::Fixed) -> RunEvent {
        let content = &self.content;
        let config = &self.config;
        let state = &mut self.state;
        let player = &state.player;
        let mut choices = Vec::new();

        if player.skill_points > 0 {
            let eligible: Vec<String> = content
                .skills
                .iter()
                .filter(|skill| player.skill_points_in(&skill.id) < skill.max_points)
                .filter(|skill| {
                    skill
                        .prerequisites
                        .iter()
                        .all(|prereq| player.skill_points_in(prereq) > 0)
                })
                .map(|skill| skill.id.clone())
                .collect();
            push_choice(
                &mut choices,
                ChoiceKind::SkillAllocation,
                &mut state.rng,
                &eligible,
                config.skill_options,
            );
        }

        let perks: Vec<String> = content
            .perks
            .iter()
            .filter(|perk| !player.perks.contains(&perk.id))
            .map(|perk| perk.id.clone())
            .collect();
        push_choice(&mut choices, ChoiceKind::Perk, &mut state.rng, &perks, config.perk_options);

        let rolled = state.rng.chance(item_drop_chance);
        let forced = !rolled && state.waves_since_item_offer + 1 >= config.item_pity_waves;
        let items: Vec<String> = content
            .items
            .iter()
            .filter(|item| !player.items.iter().any(|equipped| equipped.id == item.id))
            .map(|item| item.id.clone())
            .collect();
        let offered_item = (rolled || forced)
            && push_choice(
                &mut choices,
                ChoiceKind::Item,
                &mut state.rng,
                &items,
                config.item_options,
            );
        if offered_item {
            state.waves_since_item_offer = 0;
        } else {
            state.waves_since_item_offer += 1;
        }

        let count = u32::try_from(choices.len()).unwrap_or(u32::MAX);
        state.pending_choices = choices;
        RunEvent::ChoicesOffered {
            count,
            item_forced: offered_item && forced,
        }
    }

    fn record_combat_event(&mut self, event: &CombatEvent) {
        self.log_hash = chain_hash(self.log_hash, event);
        self.events_emitted += 1;
    }

    fn record_run_events(&mut self, events: &[RunEvent]) {
        for event in events {
            self.log_hash = chain_hash(self.log_hash, event);
            self.events_emitted += 1;
            if let RunEvent::RunEnded { victory, waves_cleared } = event {
                tracing::debug!(victory, waves_cleared, seed = self.state.seed, "Run ended");
            }
        }
        self.run_events.extend_from_slice(events);
    }
}

fn unknown(kind: &'static str, id: &str) -> SimError {
    SimError::UnknownRecord {
        kind,
        id: id.to_string(),
    }
}

/// Offer up to `count` of `pool`. Returns true if a choice was added.
fn push_choice(
    choices: &mut Vec<Choice>,
    kind: ChoiceKind,
    rng: &mut SeededRng,
    pool: &[String],
    count: usize,
) -> bool {
    let options = rng.pick_n(pool, count);
    if options.is_empty() {
        return false;
    }
    choices.push(Choice { kind, options });
    true
}

/// Sum the death rewards of enemies in a combat log.
fn kill_rewards(events: &[CombatEvent]) -> (u32, u32) {
    events
        .iter()
        .filter_map(|event| match event.kind {
            CombatEventKind::Death {
                entity,
                xp_reward,
                gold_reward,
                ..
            } if entity != EntityId::PLAYER => Some((xp_reward, gold_reward)),
            _ => None,
        })
        .fold((0u32, 0u32), |(xp, gold), (x, g)| {
            (xp.saturating_add(x), gold.saturating_add(g))
        })
}

/// Recompute base stats, grants and keystones from the player's build.
///
/// Max HP gains are added to current HP; losses only clamp.
fn rebuild_player(content: &ContentLibrary, player: &mut Player) {
    let mut modifiers = StatModifiers::default();
    let mut grants: Vec<EffectGrant> = Vec::new();
    let mut keystones = Vec::new();

    if let Some(relic) = player.relic.as_deref().and_then(|id| content.get_relic(id)) {
        modifiers = modifiers.combine(&relic.modifiers);
        grants.extend_from_slice(&relic.grants);
    }
    for (skill_id, &points) in &player.allocated_skills {
        let Some(skill) = content.get_skill(skill_id) else {
            continue;
        };
        if points == 0 {
            continue;
        }
        modifiers = modifiers.combine(&skill.modifiers.scaled(points));
        grants.extend_from_slice(&skill.grants);
        if let Some(keystone) = skill.keystone {
            keystones.push(keystone);
        }
    }
    for perk in player.perks.iter().filter_map(|id| content.get_perk(id)) {
        modifiers = modifiers.combine(&perk.modifiers);
        grants.extend_from_slice(&perk.grants);
    }
    for item in player.items.iter().filter_map(|equipped| content.get_item(&equipped.id)) {
        modifiers = modifiers.combine(&item.modifiers);
        grants.extend_from_slice(&item.grants);
    }

    let base = Stats::player_default().apply_modifiers(&modifiers);
    let entity = &mut player.entity;
    let gained = (base.max_hp - entity.base.max_hp).max(crate::math::Fixed::ZERO);
    let hp = entity.stats.hp + gained;

    entity.base = base;
    entity.stats = base;
    entity.stats.hp = hp;
    entity.stats.clamp();
    entity.grants = grants;

    player.keystones.clear();
    for keystone in keystones {
        player.unlock_keystone(keystone);
    }
}

/// Instantiate a wave's enemies in spawn order, boss last.
///
/// Elite affixes are drawn from `rng` without replacement.
///
/// # Errors
/// Returns an error for unknown templates or an empty wave.
pub fn spawn_wave(
    content: &ContentLibrary,
    wave: &WaveData,
    rng: &mut SeededRng,
) -> Result<Vec<Enemy>> {
    let mut enemies = Vec::new();

    for spawn in &wave.enemies {
        let template = content
            .get_enemy(&spawn.template)
            .ok_or_else(|| SimError::UnknownEnemy(spawn.template.clone()))?;

        for _ in 0..spawn.count {
            let id = EntityId::enemy(u32::try_from(enemies.len()).unwrap_or(u32::MAX));
            let mut stats = template.stats.to_stats();
            let mut grants = template.grants.clone();
            let mut affixes = Vec::new();
            let mut name = template.name.clone();

            if spawn.elite {
                let pool: Vec<_> = content.affixes.iter().collect();
                for affix in rng.pick_n(&pool, spawn.affix_count as usize) {
                    stats = stats.apply_modifiers(&affix.modifiers);
                    grants.extend_from_slice(&affix.grants);
                    affixes.push(affix.id.clone());
                }
                stats.hp = stats.max_hp;
                name = format!("Elite {name}");
            }

            let entity = Entity::new(id, name, stats).with_grants(grants);
            let mut enemy = Enemy::new(entity, &template.id)
                .with_rewards(template.xp_reward, template.gold_reward);
            enemy.elite = spawn.elite;
            enemy.affixes = affixes;
            enemies.push(enemy);
        }
    }

    if let Some(boss_id) = &wave.boss {
        let boss = content
            .get_boss(boss_id)
            .ok_or_else(|| SimError::UnknownBoss(boss_id.clone()))?;
        let id = EntityId::enemy(u32::try_from(enemies.len()).unwrap_or(u32::MAX));
        let entity = Entity::new(id, boss.name.clone(), boss.stats.to_stats())
            .with_grants(boss.grants.clone());
        enemies.push(
            Enemy::new(entity, &boss.id)
                .with_rewards(boss.xp_reward, boss.gold_reward)
                .with_phases(boss.phases.clone()),
        );
    }

    if enemies.is_empty() {
        return Err(SimError::EmptyWave(wave.number));
    }
    Ok(enemies)
}
