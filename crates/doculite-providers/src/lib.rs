//! SQLite storage backend for doculite: DDL compiler, query compiler,
//! async/blocking drivers, vector engine, and migrator, all behind the
//! `doculite-domain` port traits.

pub mod sqlite;
