// handlers/mod.rs - HTTP handlers grouped by route family
//
// root          → /, /health
// programs      → /api/:lang/programs/:program_id (assembled program)
// data          → /api/:lang/data/:resource[/:uid] (generic CRUD)
// certificates  → /api/certificates/*
// telegram      → /api/telegram/*

pub mod certificates;
pub mod data;
pub mod programs;
pub mod root;
pub mod telegram;
