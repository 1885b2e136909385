//! bdaykeeper Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `FileMetadata`, `LocalCacheEntry`, `SyncDecision`,
//!   `ScheduleRequest`, `RemoteConfigDocument`, `BirthdayTarget`
//! - **Port definitions** - Traits for adapters: `IRemoteStore`, `ICredentialSource`,
//!   `IConfigSource`, `IAlarmBackend`, `ISettingsStore`
//! - **Use cases** - `LayeredConfigSource`, `FetchRemoteConfigUseCase`
//!
//! # Architecture
//!
//! The domain module contains pure decision logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain types through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
