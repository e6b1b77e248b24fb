// ============================================================================
// CandleDeck - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;     // Contrat du backend, client HTTP, orchestrateur de fetch
pub mod app;     // État de la session
pub mod chart;   // Séries, ChartController, surface terminal
pub mod config;  // Configuration (env + .env)
pub mod models;  // Structures de données
pub mod sources; // Statuts, normalisation, registre des sources
pub mod ui;      // Interface utilisateur
