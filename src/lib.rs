//! # Kielo
//!
//! Illustrated bilingual vocabulary cards. A generative-AI text service
//! supplies Finnish words with translations and example sentences, an image
//! service draws each word, and the layout engine sets the text around the
//! picture on a fixed portrait canvas.
//!
//! # Architecture: Linear Stage Pipeline
//!
//! Each stage reads the previous stage's artifact from disk and writes its
//! own, so any stage can be re-run on its own:
//!
//! ```text
//! 1. Words       topic         →  words_<topic>.json
//! 2. Grammar     words JSON    →  words JSON (corrected in place)
//! 3. Illustrate  words JSON    →  illustrations/*.png + mapping.json
//! 4. Overlay     words + PNGs  →  illustrations_with_text/*.png
//! 5. Caption     topic         →  caption_<topic>.txt
//! ```
//!
//! - **Restartability**: a failed stage leaves earlier artifacts intact;
//!   `build --from <stage>` picks up from there.
//! - **Testability**: collaborators and the imaging backend are traits, so
//!   every stage runs in tests against fakes without network or fonts.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | `WordEntry` / `WordList`, the JSON shape shared by every stage |
//! | [`mapping`] | Word → illustration file association (`mapping.json`) |
//! | [`naming`] | Sanitized, collision-free artifact filenames |
//! | [`genai`] | `TextGenerator` / `ImageGenerator` traits, Gemini REST client, prompts |
//! | [`words`] | Stage 1: word-list generation, response parsing, offline vocabulary |
//! | [`grammar`] | Stage 2: per-entry verification and correction |
//! | [`illustrate`] | Stage 3: illustrations composed onto blank cards |
//! | [`layout`] | Pure text layout: wrapping, auto-scaling, vertical fitting |
//! | [`imaging`] | Pure-Rust compose/render backend and font loading |
//! | [`cache`] | Content-addressed cache of rendered cards |
//! | [`overlay`] | Stage 4: layout + render for every entry |
//! | [`caption`] | Stage 5: social-media caption |
//! | [`pipeline`] | Stage ordering, artifact checks, progress events |
//! | [`config`] | Layered `kielo.toml` loading and validation |
//! | [`error`] | `ErrorKind`: skip-the-entry vs abort-the-stage classification |
//! | [`output`] | CLI output formatting for every stage |
//!
//! # Design Decisions
//!
//! ## Layout Is Pure
//!
//! The [`layout`] module never opens a font or an image. It asks a
//! [`layout::TextMeasurer`] for advances and returns positioned lines;
//! drawing is the backend's job. Layout tests use a fixed-advance measurer
//! and are exact.
//!
//! ## Mapping Over Directory Listings
//!
//! Filenames are sanitized (`pöytä` → `poyta`) and can collide, so the
//! overlay stage never guesses which PNG belongs to which word. The
//! illustration stage records each file in [`mapping::Mapping`].
//!
//! ## Degrade, Don't Stop
//!
//! Without an API key the pipeline still runs: word lists and captions come
//! from built-in tables and grammar verification is skipped. Per-entry
//! problems (a blocked image, text that cannot fit) skip that entry; only an
//! unreachable service or a failed write aborts a stage.

pub mod cache;
pub mod caption;
pub mod config;
pub mod error;
pub mod genai;
pub mod grammar;
pub mod illustrate;
pub mod imaging;
pub mod layout;
pub mod mapping;
pub mod naming;
pub mod output;
pub mod overlay;
pub mod pipeline;
pub mod types;
pub mod words;

#[cfg(test)]
pub(crate) mod test_helpers;
