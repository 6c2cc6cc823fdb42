// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/context.rs - Read-phase breadcrumbs and non-fatal diagnostics.
 *  Copyright (C) 2026  Forest Crossman <cyrozap@gmail.com>
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

/*!
 * # `context` Module
 *
 * Every read phase pushes a short description onto a [ContextStack] and pops
 * it again when the returned [ContextGuard] is dropped, on success and on
 * error alike. Fatal errors are wrapped with the trail that was active at the
 * point of failure; non-fatal problems become [Diagnostic] records.
 */

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::error::{Error, Result};

const SEPARATOR: &str = " > ";

/// A stack of human-readable phase descriptions.
#[derive(Debug, Clone, Default)]
pub struct ContextStack {
    frames: Rc<RefCell<Vec<String>>>,
}

/// Pops its phase from the owning [ContextStack] when dropped.
#[must_use = "the phase is popped as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ContextGuard {
    frames: Rc<RefCell<Vec<String>>>,
    depth: usize,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.frames.borrow_mut().truncate(self.depth - 1);
    }
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `description` and returns the guard that pops it.
    pub fn enter(&self, description: impl Into<String>) -> ContextGuard {
        let mut frames = self.frames.borrow_mut();
        frames.push(description.into());
        ContextGuard {
            frames: Rc::clone(&self.frames),
            depth: frames.len(),
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    /// The active phases joined into a single breadcrumb string.
    pub fn trail(&self) -> String {
        self.frames.borrow().join(SEPARATOR)
    }

    /// Wraps `err` with the current trail unless it already carries one.
    pub fn attach(&self, err: Error) -> Error {
        match err {
            Error::Context { .. } => err,
            other => Error::Context {
                trail: self.trail(),
                source: Box::new(other),
            },
        }
    }

    /// Runs `f` inside a phase named `description`.
    ///
    /// Errors leaving `f` are annotated with the innermost trail, so outer
    /// phases see an already-annotated error and pass it through untouched.
    pub fn scope<T>(
        &self,
        description: impl Into<String>,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let _guard = self.enter(description);
        f().map_err(|err| self.attach(err))
    }

    /// Records a non-fatal problem against the current trail.
    pub fn diagnostic(&self, lib_ref: Option<&str>, message: impl Into<String>) -> Diagnostic {
        let diagnostic = Diagnostic {
            trail: self.trail(),
            lib_ref: lib_ref.map(String::from),
            message: message.into(),
        };
        warn!("{}", diagnostic);
        diagnostic
    }
}

/// A problem that did not abort the read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The phases active when the problem was found.
    pub trail: String,
    /// The cross-reference entry concerned, when there is one.
    pub lib_ref: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lib_ref {
            Some(lib_ref) => write!(f, "{} [{}]: {}", self.trail, lib_ref, self.message),
            None => write!(f, "{}: {}", self.trail, self.message),
        }
    }
}
