// src/ingest/filter.rs
//! Removes administrative and non-content pages from a ranked list.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::ingest::decode_title;
use crate::ingest::types::Article;

/// Namespace prefixes (decoded form) across de/fr/it/en.
pub const UNWANTED_PREFIXES: &[&str] = &[
    // en
    "Special:", "Talk:", "User:", "User talk:", "Wikipedia:", "Wikipedia talk:", "File:",
    "File talk:", "Template:", "Template talk:", "Help:", "Help talk:", "Category:",
    "Category talk:", "Portal:", "Draft:", "MediaWiki:", "Module:",
    // de
    "Spezial:", "Diskussion:", "Benutzer:", "Benutzerin:", "Benutzer Diskussion:",
    "Wikipedia Diskussion:", "Datei:", "Datei Diskussion:", "Vorlage:", "Vorlage Diskussion:",
    "Hilfe:", "Hilfe Diskussion:", "Kategorie:", "Kategorie Diskussion:", "Portal Diskussion:",
    // fr
    "Spécial:", "Discussion:", "Utilisateur:", "Utilisatrice:", "Discussion utilisateur:",
    "Wikipédia:", "Discussion Wikipédia:", "Fichier:", "Discussion fichier:", "Modèle:",
    "Discussion modèle:", "Aide:", "Discussion aide:", "Catégorie:", "Discussion catégorie:",
    "Portail:", "Projet:", "Module:",
    // it
    "Speciale:", "Discussione:", "Utente:", "Discussioni utente:", "Discussioni Wikipedia:",
    "Discussioni file:", "Discussioni template:", "Aiuto:", "Discussioni aiuto:",
    "Categoria:", "Discussioni categoria:", "Portale:", "Progetto:",
];

/// Exact non-content titles: home pages, search and cookie pages.
pub const UNWANTED_TITLES: &[&str] = &[
    "-",
    "Main Page",
    "Hauptseite",
    "Wikipedia:Hauptseite",
    "Accueil",
    "Accueil principal",
    "Wikipédia:Accueil principal",
    "Pagina principale",
    "Search",
    "Suche",
    "Recherche",
    "Ricerca",
    "Cookie statement",
    "Cookie-Richtlinie",
    "Déclaration sur les témoins (cookies)",
    "Informativa sui cookie",
    "Undefined",
];

static EXACT: Lazy<HashSet<&'static str>> = Lazy::new(|| UNWANTED_TITLES.iter().copied().collect());

/// True if the decoded title belongs to one of the unwanted sets.
fn is_unwanted_title(title: &str) -> bool {
    EXACT.contains(title)
        || UNWANTED_PREFIXES.iter().any(|p| title.starts_with(p))
}

pub fn is_unwanted(article: &Article) -> bool {
    is_unwanted_title(&decode_title(&article.identifier))
}

/// Order-preserving; never mutates the input.
pub fn filter_unwanted(articles: &[Article]) -> Vec<Article> {
    articles
        .iter()
        .filter(|a| !is_unwanted(a))
        .cloned()
        .collect()
}
