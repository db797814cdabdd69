//! Built-in variable registry
//!
//! Names the host may supply values for. Rules can read them but never
//! assign to them. Some old names are kept as aliases of their
//! replacements, and a few names are disabled outright.

/// Variables supplied by the host
const BUILTIN_VARS: &[&str] = &[
    "action",
    "timestamp",
    "wiki_name",
    "wiki_language",
    "user_name",
    "user_unnamed_ip",
    "user_type",
    "user_editcount",
    "user_age",
    "user_groups",
    "user_rights",
    "user_blocked",
    "user_emailconfirm",
    "page_id",
    "page_namespace",
    "page_title",
    "page_prefixedtitle",
    "page_restrictions_edit",
    "page_restrictions_move",
    "page_restrictions_create",
    "page_restrictions_upload",
    "page_recent_contributors",
    "page_first_contributor",
    "page_age",
    "moved_from_id",
    "moved_from_namespace",
    "moved_from_title",
    "moved_from_prefixedtitle",
    "moved_to_id",
    "moved_to_namespace",
    "moved_to_title",
    "moved_to_prefixedtitle",
    "summary",
    "new_wikitext",
    "old_wikitext",
    "edit_diff",
    "edit_diff_pst",
    "new_size",
    "old_size",
    "edit_delta",
    "added_lines",
    "removed_lines",
    "added_lines_pst",
    "new_pst",
    "new_html",
    "new_text",
    "all_links",
    "old_links",
    "added_links",
    "removed_links",
    "tor_exit_node",
    "file_sha1",
    "file_size",
    "file_mime",
    "file_mediatype",
    "file_width",
    "file_height",
    "file_bits_per_channel",
];

/// Deprecated name -> current name
const DEPRECATED_VARS: &[(&str, &str)] = &[
    ("article_text", "page_title"),
    ("article_prefixedtext", "page_prefixedtitle"),
    ("article_namespace", "page_namespace"),
    ("article_articleid", "page_id"),
    ("article_restrictions_edit", "page_restrictions_edit"),
    ("article_restrictions_move", "page_restrictions_move"),
    ("article_restrictions_create", "page_restrictions_create"),
    ("article_restrictions_upload", "page_restrictions_upload"),
    ("article_recent_contributors", "page_recent_contributors"),
    ("article_first_contributor", "page_first_contributor"),
    ("moved_from_text", "moved_from_title"),
    ("moved_from_prefixedtext", "moved_from_prefixedtitle"),
    ("moved_from_articleid", "moved_from_id"),
    ("moved_to_text", "moved_to_title"),
    ("moved_to_prefixedtext", "moved_to_prefixedtitle"),
    ("moved_to_articleid", "moved_to_id"),
];

/// Names that still parse but may no longer be used
const DISABLED_VARS: &[&str] = &["old_text", "old_html", "minor_edit"];

/// Current builtin names, excluding deprecated aliases and disabled names
pub fn builtin_var_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_VARS.iter().copied()
}

/// Any name the host owns: current, deprecated or disabled
pub fn is_builtin_var(name: &str) -> bool {
    BUILTIN_VARS.contains(&name) || deprecated_alias(name).is_some() || is_disabled_var(name)
}

pub fn deprecated_alias(name: &str) -> Option<&'static str> {
    DEPRECATED_VARS
        .iter()
        .find(|(old, _)| *old == name)
        .map(|(_, new)| *new)
}

pub fn is_disabled_var(name: &str) -> bool {
    DISABLED_VARS.contains(&name)
}
