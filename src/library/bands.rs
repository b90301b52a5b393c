//! Band name exceptions
//!
//! Maps misspelled or differently formatted artist names to the form the
//! player files them under. `AC/DC` becomes `AC-DC` since a slash cannot
//! appear in a folder name.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::error::LibraryError;

/// Built-in `(variant, correct name)` pairs seeded with category `builtin`
pub const BUILTIN_EXCEPTIONS: &[(&str, &str)] = &[
    ("AC/DC", "AC-DC"),
    ("AC~DC", "AC-DC"),
    ("AC_DC", "AC-DC"),
    ("ACDC", "AC-DC"),
    ("AC DC", "AC-DC"),
    ("AC.DC", "AC-DC"),
    ("AC*DC", "AC-DC"),
    ("AC & DC", "AC-DC"),
    ("AC+DC", "AC-DC"),
    ("AC|DC", "AC-DC"),
    ("Ac/Dc", "AC-DC"),
    ("ac/dc", "AC-DC"),
    ("Special", "38 Special"),
    (".38 Special", "38 Special"),
    ("38Special", "38 Special"),
    ("Thirty Eight Special", "38 Special"),
    ("Guns N Roses", "Guns N' Roses"),
    ("GunsNRoses", "Guns N' Roses"),
    ("Guns n Roses", "Guns N' Roses"),
    ("Guns & Roses", "Guns N' Roses"),
    ("Guns and Roses", "Guns N' Roses"),
    ("Guns 'N Roses", "Guns N' Roses"),
    ("Guns 'n' Roses", "Guns N' Roses"),
    ("Blink 182", "Blink-182"),
    ("Blink182", "Blink-182"),
    ("Sum41", "Sum 41"),
    ("3DoorsDown", "3 Doors Down"),
    ("Three Doors Down", "3 Doors Down"),
    ("7 Mary 3", "Seven Mary Three"),
    ("Seven Mary 3", "Seven Mary Three"),
    ("7Mary3", "Seven Mary Three"),
    ("Panic at the Disco", "Panic! At The Disco"),
    ("Panic At The Disco", "Panic! At The Disco"),
    ("P!ATD", "Panic! At The Disco"),
    ("MCR", "My Chemical Romance"),
    ("FOB", "Fall Out Boy"),
    ("Simon and Garfunkel", "Simon & Garfunkel"),
    ("Salt n Pepa", "Salt-N-Pepa"),
    ("Salt N Pepa", "Salt-N-Pepa"),
    ("Salt and Pepa", "Salt-N-Pepa"),
    ("Salt & Pepa", "Salt-N-Pepa"),
    ("Beatles", "The Beatles"),
    ("Rolling Stones", "The Rolling Stones"),
    ("Who", "The Who"),
    ("Doors", "The Doors"),
    ("Kinks", "The Kinks"),
    ("Clash", "The Clash"),
    ("Cure", "The Cure"),
    ("Police", "The Police"),
    ("Smiths", "The Smiths"),
    ("White Stripes", "The White Stripes"),
    ("Black Keys", "The Black Keys"),
    ("Strokes", "The Strokes"),
    ("Killers", "The Killers"),
    ("Ramones", "The Ramones"),
    ("Beatles, The", "The Beatles"),
    ("Rolling Stones, The", "The Rolling Stones"),
    ("Who, The", "The Who"),
    ("Doors, The", "The Doors"),
    ("Lynard Skynard", "Lynyrd Skynyrd"),
    ("Lynyrd Skynard", "Lynyrd Skynyrd"),
    ("Leonard Skynard", "Lynyrd Skynyrd"),
    ("Led Zeplin", "Led Zeppelin"),
    ("Led Zepplin", "Led Zeppelin"),
    ("Def Leopard", "Def Leppard"),
    ("Def Lepard", "Def Leppard"),
    ("pink floyd", "Pink Floyd"),
    ("PINK FLOYD", "Pink Floyd"),
    ("metallica", "Metallica"),
    ("METALLICA", "Metallica"),
    ("queen", "Queen"),
    ("QUEEN", "Queen"),
    ("u2", "U2"),
    ("U-2", "U2"),
    ("Wu Tang Clan", "Wu-Tang Clan"),
    ("Wu-Tang", "Wu-Tang Clan"),
    ("Outkast", "OutKast"),
    ("T.L.C.", "TLC"),
    ("NWA", "N.W.A"),
    ("N.W.A.", "N.W.A"),
    ("N W A", "N.W.A"),
    ("Deadmau5", "deadmau5"),
    ("DEADMAU5", "deadmau5"),
    ("Motorhead", "Motörhead"),
    ("Blue Oyster Cult", "Blue Öyster Cult"),
    ("NIN", "Nine Inch Nails"),
    ("RHCP", "Red Hot Chili Peppers"),
    ("Red Hot Chilli Peppers", "Red Hot Chili Peppers"),
    ("Hank Williams Jr", "Hank Williams Jr."),
    ("Hank Jr", "Hank Williams Jr."),
    ("The Eagles", "Eagles"),
    ("Greenday", "Green Day"),
    ("Social D", "Social Distortion"),
    ("Emerson Lake and Palmer", "Emerson, Lake & Palmer"),
    ("Emerson Lake & Palmer", "Emerson, Lake & Palmer"),
    ("ELP", "Emerson, Lake & Palmer"),
];

/// One row of `band_name_exceptions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandException {
    /// Name as it appears in tags
    pub variant: String,
    /// Name the artist is rewritten to
    pub correct_name: String,
    /// "builtin", "manual" or "auto-detected"
    pub category: String,
    /// Number of track rows rewritten so far
    pub usage_count: i64,
}

/// Insert the built-in exceptions that are not present yet
///
/// Existing variants keep their stored correction. Returns the number of
/// rows inserted.
pub(crate) fn seed_builtin_exceptions(conn: &Connection) -> Result<usize, LibraryError> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO band_name_exceptions (variant, correct_name, category)
         VALUES (?1, ?2, 'builtin')",
    )?;

    let mut inserted = 0;
    for (variant, correct) in BUILTIN_EXCEPTIONS {
        inserted += stmt.execute(params![variant, correct])?;
    }

    // Older builds stored the slash form as the target
    conn.execute(
        "UPDATE band_name_exceptions SET correct_name = 'AC-DC' WHERE correct_name = 'AC/DC'",
        [],
    )?;

    log::debug!("Seeded {} built-in band name exceptions", inserted);
    Ok(inserted)
}

/// Insert or replace a user exception, keeping its usage count
pub(crate) fn upsert_exception(
    conn: &Connection,
    variant: &str,
    correct_name: &str,
    category: &str,
) -> Result<(), LibraryError> {
    conn.execute(
        "INSERT OR REPLACE INTO band_name_exceptions
             (variant, correct_name, category, usage_count, updated_at)
         VALUES (?1, ?2, ?3,
             COALESCE((SELECT usage_count FROM band_name_exceptions WHERE variant = ?1), 0),
             datetime('now'))",
        params![variant, correct_name, category],
    )?;
    Ok(())
}

/// All exceptions ordered by variant
pub(crate) fn list_exceptions(conn: &Connection) -> Result<Vec<BandException>, LibraryError> {
    let mut stmt = conn.prepare(
        "SELECT variant, correct_name, COALESCE(category, 'manual'), COALESCE(usage_count, 0)
         FROM band_name_exceptions ORDER BY variant",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(BandException {
            variant: row.get(0)?,
            correct_name: row.get(1)?,
            category: row.get(2)?,
            usage_count: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Rewrite `tracks.artist` values that match a variant
///
/// Returns the number of track rows changed.
pub(crate) fn apply_exceptions(conn: &mut Connection) -> Result<usize, LibraryError> {
    let tx = conn.transaction()?;
    let mut changed = 0;
    {
        let pairs: Vec<(String, String)> = {
            let mut stmt = tx.prepare(
                "SELECT variant, correct_name FROM band_name_exceptions
                 WHERE variant != correct_name ORDER BY id",
            )?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut rewrite = tx.prepare("UPDATE tracks SET artist = ?1 WHERE artist = ?2")?;
        let mut bump = tx.prepare(
            "UPDATE band_name_exceptions
             SET usage_count = COALESCE(usage_count, 0) + ?1, updated_at = datetime('now')
             WHERE variant = ?2",
        )?;

        for (variant, correct) in &pairs {
            let n = rewrite.execute(params![correct, variant])?;
            if n > 0 {
                log::debug!("Artist '{}' -> '{}' on {} tracks", variant, correct, n);
                bump.execute(params![n as i64, variant])?;
                changed += n;
            }
        }
    }
    tx.commit()?;
    Ok(changed)
}
