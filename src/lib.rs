// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! # DataFusion Array Provider
//!
//! This crate exposes array-structured binary datasets (multi-dimensional
//! arrays stored in scientific file formats) to DataFusion as plain row scans.
//! Every element of an array becomes one row carrying the file it came from,
//! its position in the flattened array, and its value.
//!
//! ## Architecture Overview
//!
//! Work is described up front as a list of [`types::ScanItem`]s, each one an
//! independent unit of reading:
//!
//! 1. **Unbounded**: the whole dataset
//! 2. **Bounded**: a contiguous run of elements starting at a linear offset
//! 3. **BoundedMultiDimensional**: one rectangular block of a multi-axis dataset
//!
//! Deciding how a dataset is split into items is left to the caller. The
//! crate executes items, it does not plan them.
//!
//! ## Core Components
//!
//! ### Scan Model
//! - [`types::DatasetDescriptor`]: Static metadata of one dataset (file, path, type, dimensions)
//! - [`types::ScanItem`]: Enum of the three scan shapes plus the requested output columns
//! - [`types::CatalogKind`]: The reserved catalog paths answering metadata-only scans
//!
//! ### Execution Engine
//! - [`physical_plan::projection::ResolvedProjection`]: Which of `FileID`, `Index`, `Value` to produce, and in which order
//! - [`physical_plan::catalog`]: Single-row scans of the file, dataset and attribute catalogs
//! - [`physical_plan::linear_index::BlockIndexMapper`]: Maps positions inside a block to linear dataset indices
//! - [`physical_plan::executor::ScanExecutor`]: Runs one item against a [`physical_plan::reader::DatasetReader`]
//!
//! ### DataFusion Integration
//! - [`provider::ArrayTableProvider`]: `TableProvider` over a set of scan items
//! - [`physical_plan::exec::scan::ArrayScanExec`]: `ExecutionPlan` with one partition per scan item
//!
//! ## Output Columns
//!
//! Real datasets produce up to three columns:
//!
//! | Column   | Type             | Meaning                                   |
//! |----------|------------------|-------------------------------------------|
//! | `FileID` | `Int64`          | Identifier of the source file             |
//! | `Index`  | `Int64`          | Row-major linear index in the full array  |
//! | `Value`  | dataset specific | The element itself                        |
//!
//! An empty column request yields all three in that order. A non-empty
//! request is honoured in request order, with unknown names ignored. When
//! `Value` is not requested no array data is read at all: indices are
//! computed from the item's bounds.
//!
//! Catalog scans (`catalog://files`, `catalog://datasets`,
//! `catalog://attributes`) always return exactly one row describing the
//! item's descriptor.
//!
//! ## Block Index Mapping
//!
//! A block read returns elements row-major over the block. For a dataset of
//! dimensions `[R, C]` and a block at offset `[or, oc]`, the element at
//! block position `(lr, lc)` has linear index `(or + lr) * C + (oc + lc)`.
//! Blocks at the end of an axis may be shorter than the block shape; their
//! extent is whatever remains of the axis. The same row-major arithmetic is
//! applied for any number of axes.
//!
//! ```text
//! dimensions [5, 7], block shape [2, 3]
//!
//!        0  1  2 | 3  4  5 | 6
//!     0  .  .  . | .  .  . | .     block [2,3] at [0,6] is an edge
//!     1  .  .  . | .  .  . | .     block spanning [2,1]
//!     ---------------------------
//!     2  .  .  . | .  .  . | .
//!     3  .  .  . | .  .  . | .
//!     ---------------------------
//!     4  .  .  . | .  .  . | .     last block row spans a single row
//! ```
//!
//! ## Resource Handling
//!
//! Each executed item opens its own dataset session and closes it before
//! returning, including when a read fails. Executors share no mutable state,
//! so partitions can run concurrently.

pub mod config;
pub mod physical_plan;
pub mod provider;
pub mod types;
