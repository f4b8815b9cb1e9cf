/// Instructional system message sent ahead of every user turn.
///
/// Defaults to `assets/system_prompt.md`. `build.rs` forwards `CASTOR_SYSTEM_PROMPT` from the
/// build environment (or `.env`), which replaces the bundled text; the value must fit on one line.
pub const SYSTEM_PROMPT: &str = match option_env!("CASTOR_SYSTEM_PROMPT") {
    Some(prompt) => prompt,
    None => include_str!("../../assets/system_prompt.md"),
};
