// ============================================================================
// Structure : SourceRegistry
// ============================================================================
// Associe chaque provider à sa séquence de chandelles, pour UN symbole
//
// INVARIANTS :
// - jamais de séquence vide
// - jamais d'entrées de deux cycles différents
// - ordre = ordre de première arrivée réussie (pas alphabétique)
//
// CONCEPT RUST : Vec<(String, Vec<Candle>)> plutôt que HashMap
// - HashMap ne garde pas l'ordre d'insertion
// - Peu de providers : la recherche linéaire est négligeable
// ============================================================================

use tracing::debug;

use crate::models::{Candle, CycleId};

/// Registre des sources affichables pour le cycle courant
#[derive(Debug, Default)]
pub struct SourceRegistry {
    /// Cycle auquel appartiennent les entrées
    cycle: CycleId,

    /// Entrées dans l'ordre de première arrivée
    entries: Vec<(String, Vec<Candle>)>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vide entièrement le registre et l'associe à un nouveau cycle
    ///
    /// Appelé une seule fois au début de chaque cycle, avant toute réponse.
    pub fn reset(&mut self, cycle: CycleId) {
        debug!(%cycle, dropped = self.entries.len(), "Resetting source registry");
        self.cycle = cycle;
        self.entries.clear();
    }

    /// Enregistre les chandelles d'un provider
    ///
    /// Retourne false sans rien modifier si :
    /// - le cycle n'est pas le cycle courant (résultat périmé)
    /// - la séquence est vide
    ///
    /// Un provider déjà présent est écrasé en gardant sa position.
    pub fn register(&mut self, cycle: CycleId, provider: &str, candles: Vec<Candle>) -> bool {
        if cycle != self.cycle {
            debug!(%cycle, current = %self.cycle, provider, "Ignoring stale registration");
            return false;
        }

        if candles.is_empty() {
            debug!(provider, "Ignoring empty candle sequence");
            return false;
        }

        match self.entries.iter_mut().find(|(name, _)| name == provider) {
            Some((_, existing)) => *existing = candles,
            None => self.entries.push((provider.to_string(), candles)),
        }
        true
    }

    /// Providers disponibles, dans l'ordre de première arrivée
    pub fn list_available(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Chandelles d'un provider
    pub fn get(&self, provider: &str) -> Option<&[Candle]> {
        self.entries
            .iter()
            .find(|(name, _)| name == provider)
            .map(|(_, candles)| candles.as_slice())
    }

    /// Premier provider arrivé (choix d'affichage par défaut)
    pub fn first(&self) -> Option<&str> {
        self.entries.first().map(|(name, _)| name.as_str())
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.get(provider).is_some()
    }

    pub fn cycle(&self) -> CycleId {
        self.cycle
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
