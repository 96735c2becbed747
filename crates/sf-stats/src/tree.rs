//! Predicate-gated statistics tree

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sf_engine::PlayResult;

use crate::error::{StatsError, StatsResult};
use crate::report::TreeRow;

// ═══════════════════════════════════════════════════════════════════════════
// NODE IDENTITY
// ═══════════════════════════════════════════════════════════════════════════

/// Node kind within the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Root,
    GameMode,
    Tag,
    Symbol,
    SymbolCount,
}

/// Node identity for clone/merge purposes:
/// the tuple (kind, game mode, tag, symbol, run length).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub kind: NodeKind,
    pub game_mode: Option<String>,
    pub tag: Option<String>,
    pub symbol: Option<u32>,
    pub count: Option<u8>,
}

impl NodeKey {
    pub fn root() -> Self {
        Self {
            kind: NodeKind::Root,
            game_mode: None,
            tag: None,
            symbol: None,
            count: None,
        }
    }

    pub fn mode(game_mode: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::GameMode,
            game_mode: Some(game_mode.into()),
            ..Self::root()
        }
    }

    pub fn tag(game_mode: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Tag,
            game_mode: Some(game_mode.into()),
            tag: Some(tag.into()),
            ..Self::root()
        }
    }

    pub fn symbol(
        game_mode: impl Into<String>,
        tag: Option<&str>,
        symbol: u32,
    ) -> Self {
        Self {
            kind: NodeKind::Symbol,
            game_mode: Some(game_mode.into()),
            tag: tag.map(Into::into),
            symbol: Some(symbol),
            count: None,
        }
    }

    pub fn symbol_count(
        game_mode: impl Into<String>,
        tag: Option<&str>,
        symbol: u32,
        count: u8,
    ) -> Self {
        Self {
            kind: NodeKind::SymbolCount,
            game_mode: Some(game_mode.into()),
            tag: tag.map(Into::into),
            symbol: Some(symbol),
            count: Some(count),
        }
    }

    /// Path segment used in report rows
    pub fn segment(&self) -> String {
        match self.kind {
            NodeKind::Root => "total".into(),
            NodeKind::GameMode => self.game_mode.clone().unwrap_or_default(),
            NodeKind::Tag => self.tag.clone().unwrap_or_default(),
            NodeKind::Symbol => format!("sym{}", self.symbol.unwrap_or_default()),
            NodeKind::SymbolCount => format!("x{}", self.count.unwrap_or_default()),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.segment())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PREDICATES
// ═══════════════════════════════════════════════════════════════════════════

/// Match strategy for the tag layer: arbitrary named partitions such as
/// "normal" vs "special" spins. Predicates are pure functions of the
/// result, so one instance is shared by reference across tree clones.
pub trait ResultPredicate: Send + Sync {
    fn accepts(&self, result: &PlayResult) -> bool;
}

impl<F> ResultPredicate for F
where
    F: Fn(&PlayResult) -> bool + Send + Sync,
{
    fn accepts(&self, result: &PlayResult) -> bool {
        self(result)
    }
}

/// Per-kind match rule bound at construction
#[derive(Clone)]
enum Predicate {
    /// Root: accepts everything
    Any,
    /// Result's game mode equals the node's mode
    Mode(String),
    /// Caller-supplied partition strategy
    Partition(Arc<dyn ResultPredicate>),
    /// Any win entry carries this symbol
    Symbol(u32),
    /// A win entry carries this symbol with exactly this run length
    SymbolCount { symbol: u32, count: u8 },
}

impl Predicate {
    fn accepts(&self, result: &PlayResult) -> bool {
        match self {
            Self::Any => true,
            Self::Mode(mode) => result.game_mode == *mode,
            Self::Partition(strategy) => strategy.accepts(result),
            Self::Symbol(symbol) => result.wins.iter().any(|w| w.symbol == *symbol),
            Self::SymbolCount { symbol, count } => result
                .wins
                .iter()
                .any(|w| w.symbol == *symbol && w.count == *count),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "Any"),
            Self::Mode(mode) => write!(f, "Mode({mode})"),
            Self::Partition(_) => write!(f, "Partition(..)"),
            Self::Symbol(symbol) => write!(f, "Symbol({symbol})"),
            Self::SymbolCount { symbol, count } => {
                write!(f, "SymbolCount({symbol}x{count})")
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TREE SPECIFICATION
// ═══════════════════════════════════════════════════════════════════════════

/// Static shape specification: game modes × symbols × run-length buckets,
/// with an optional tag layer of named partitions between mode and symbol.
#[derive(Clone)]
pub struct TreeSpec {
    pub modes: Vec<ModeSpec>,
}

/// One game mode's subtree specification
#[derive(Clone)]
pub struct ModeSpec {
    pub name: String,
    /// Optional tag layer; empty means symbols hang directly off the mode
    pub partitions: Vec<TagPartition>,
    pub symbols: Vec<SymbolSpec>,
}

impl ModeSpec {
    pub fn new(name: impl Into<String>, symbols: Vec<SymbolSpec>) -> Self {
        Self {
            name: name.into(),
            partitions: Vec::new(),
            symbols,
        }
    }

    pub fn with_partitions(mut self, partitions: Vec<TagPartition>) -> Self {
        self.partitions = partitions;
        self
    }
}

/// A named partition with its own match strategy
#[derive(Clone)]
pub struct TagPartition {
    pub name: String,
    pub predicate: Arc<dyn ResultPredicate>,
}

impl TagPartition {
    pub fn new(name: impl Into<String>, predicate: Arc<dyn ResultPredicate>) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

/// Symbol with its tracked run-length buckets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolSpec {
    pub id: u32,
    pub counts: Vec<u8>,
}

impl SymbolSpec {
    pub fn new(id: u32, counts: Vec<u8>) -> Self {
        Self { id, counts }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════

/// One counter node
#[derive(Debug, Clone)]
pub struct StatNode {
    key: NodeKey,
    predicate: Predicate,
    /// Predicate-match count
    pub triggers: u64,
    /// Accumulated win amount
    pub total_win: f64,
    /// total_win / total_bet, set by [`StatisticsTree::calc_rtp`]
    pub rtp: f64,
    children: BTreeMap<NodeKey, StatNode>,
}

impl StatNode {
    fn new(key: NodeKey, predicate: Predicate) -> Self {
        Self {
            key,
            predicate,
            triggers: 0,
            total_win: 0.0,
            rtp: 0.0,
            children: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn children(&self) -> impl Iterator<Item = &StatNode> {
        self.children.values()
    }

    pub fn child(&self, key: &NodeKey) -> Option<&StatNode> {
        self.children.get(key)
    }

    fn insert_child(&mut self, node: StatNode) {
        self.children.insert(node.key.clone(), node);
    }

    /// A node accumulates only when its predicate accepts the result;
    /// children are visited only after the parent accepts.
    fn on_result(&mut self, result: &PlayResult) {
        if !self.predicate.accepts(result) {
            return;
        }
        self.accumulate(result);
        for child in self.children.values_mut() {
            child.on_result(result);
        }
    }

    fn accumulate(&mut self, result: &PlayResult) {
        match self.key.kind {
            NodeKind::Root => {
                // One trigger per spin, counted on its terminal step
                if result.is_finish {
                    self.triggers += 1;
                }
                self.total_win += result.cash_win;
            }
            NodeKind::GameMode | NodeKind::Tag => {
                self.triggers += 1;
                self.total_win += result.cash_win;
            }
            NodeKind::Symbol => {
                for win in result.wins.iter().filter(|w| Some(w.symbol) == self.key.symbol) {
                    self.triggers += 1;
                    self.total_win += win.cash_win;
                }
            }
            NodeKind::SymbolCount => {
                for win in result.wins.iter().filter(|w| {
                    Some(w.symbol) == self.key.symbol && Some(w.count) == self.key.count
                }) {
                    self.triggers += 1;
                    self.total_win += win.cash_win;
                }
            }
        }
    }

    fn merge(&mut self, other: &StatNode) -> StatsResult<()> {
        if self.key != other.key || self.children.len() != other.children.len() {
            return Err(StatsError::ShapeMismatch {
                expected: self.key.to_string(),
                found: other.key.to_string(),
            });
        }
        self.triggers += other.triggers;
        self.total_win += other.total_win;
        for (key, other_child) in &other.children {
            let child = self
                .children
                .get_mut(key)
                .ok_or_else(|| StatsError::ShapeMismatch {
                    expected: self.key.to_string(),
                    found: key.to_string(),
                })?;
            child.merge(other_child)?;
        }
        Ok(())
    }

    fn calc_rtp(&mut self, total_bet: f64) {
        self.rtp = if total_bet > 0.0 {
            self.total_win / total_bet
        } else {
            0.0
        };
        for child in self.children.values_mut() {
            child.calc_rtp(total_bet);
        }
    }

    fn collect_rows(&self, path: &str, total_spins: u64, rows: &mut Vec<TreeRow>) {
        let path = if path.is_empty() {
            self.key.segment()
        } else {
            format!("{} / {}", path, self.key.segment())
        };
        rows.push(TreeRow {
            path: path.clone(),
            triggers: self.triggers,
            total_win: self.total_win,
            rtp: self.rtp,
            hit_rate: if total_spins > 0 {
                self.triggers as f64 / total_spins as f64
            } else {
                0.0
            },
        });
        for child in self.children.values() {
            child.collect_rows(&path, total_spins, rows);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TREE
// ═══════════════════════════════════════════════════════════════════════════

/// Predicate-gated hierarchy of counters, built once from a [`TreeSpec`],
/// cloned per worker shard and merged by summing identically-keyed nodes.
#[derive(Debug, Clone)]
pub struct StatisticsTree {
    root: StatNode,
}

impl StatisticsTree {
    /// Build the fixed shape from a specification
    pub fn build(spec: &TreeSpec) -> Self {
        let mut root = StatNode::new(NodeKey::root(), Predicate::Any);

        for mode in &spec.modes {
            let mut mode_node = StatNode::new(
                NodeKey::mode(&mode.name),
                Predicate::Mode(mode.name.clone()),
            );

            if mode.partitions.is_empty() {
                for symbol in &mode.symbols {
                    mode_node.insert_child(Self::symbol_subtree(&mode.name, None, symbol));
                }
            } else {
                for partition in &mode.partitions {
                    let mut tag_node = StatNode::new(
                        NodeKey::tag(&mode.name, &partition.name),
                        Predicate::Partition(Arc::clone(&partition.predicate)),
                    );
                    for symbol in &mode.symbols {
                        tag_node.insert_child(Self::symbol_subtree(
                            &mode.name,
                            Some(&partition.name),
                            symbol,
                        ));
                    }
                    mode_node.insert_child(tag_node);
                }
            }

            root.insert_child(mode_node);
        }

        Self { root }
    }

    fn symbol_subtree(mode: &str, tag: Option<&str>, spec: &SymbolSpec) -> StatNode {
        let mut symbol_node = StatNode::new(
            NodeKey::symbol(mode, tag, spec.id),
            Predicate::Symbol(spec.id),
        );
        for &count in &spec.counts {
            symbol_node.insert_child(StatNode::new(
                NodeKey::symbol_count(mode, tag, spec.id, count),
                Predicate::SymbolCount {
                    symbol: spec.id,
                    count,
                },
            ));
        }
        symbol_node
    }

    /// Classify and accumulate one play-step result
    pub fn on_result(&mut self, result: &PlayResult) {
        self.root.on_result(result);
    }

    /// Merge another shard's tree of identical shape into this one
    pub fn merge(&mut self, other: &StatisticsTree) -> StatsResult<()> {
        self.root.merge(&other.root)
    }

    /// Set `rtp = total_win / total_bet` at every node
    pub fn calc_rtp(&mut self, total_bet: f64) {
        self.root.calc_rtp(total_bet);
    }

    pub fn root(&self) -> &StatNode {
        &self.root
    }

    /// Walk a key path from (but excluding) the root
    pub fn node(&self, path: &[NodeKey]) -> Option<&StatNode> {
        let mut node = &self.root;
        for key in path {
            node = node.child(key)?;
        }
        Some(node)
    }

    /// One row per node, path-keyed, depth-first
    pub fn rows(&self, total_spins: u64) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        self.root.collect_rows("", total_spins, &mut rows);
        rows
    }
}
