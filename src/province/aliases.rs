//! Static province reference data: canonical names and their known alternate spellings.
//!
//! The table is compiled in and indexed once on first use. Lookups go through keys that
//! are lower-cased with all whitespace removed, so "Chiang Mai", "chiangmai" and
//! "CHIANG  MAI" land on the same entry.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// A canonical province name and the spellings that resolve to it.
#[derive(Debug, Clone, Copy)]
pub struct ProvinceAliasEntry {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
}

/// Canonical name of the capital; also the target of the capital-city shortcut.
pub const CAPITAL: &str = "กรุงเทพมหานคร";

/// Canonical name used for readings from across the Lao border.
pub const LAOS: &str = "Laos";

pub static PROVINCES: &[ProvinceAliasEntry] = &[
    ProvinceAliasEntry { canonical: CAPITAL, aliases: &["bangkok", "bangkok province", "bangkok metropolis", "bangkok metropolitan", "krung thep", "krungthep", "bkk"] },
    ProvinceAliasEntry { canonical: "กระบี่", aliases: &["krabi"] },
    ProvinceAliasEntry { canonical: "กาญจนบุรี", aliases: &["kanchanaburi"] },
    ProvinceAliasEntry { canonical: "กาฬสินธุ์", aliases: &["kalasin"] },
    ProvinceAliasEntry { canonical: "กำแพงเพชร", aliases: &["kamphaeng phet", "kamphaengphet"] },
    ProvinceAliasEntry { canonical: "ขอนแก่น", aliases: &["khon kaen", "khonkaen"] },
    ProvinceAliasEntry { canonical: "จันทบุรี", aliases: &["chanthaburi"] },
    ProvinceAliasEntry { canonical: "ฉะเชิงเทรา", aliases: &["chachoengsao"] },
    ProvinceAliasEntry { canonical: "ชลบุรี", aliases: &["chon buri", "chonburi"] },
    ProvinceAliasEntry { canonical: "ชัยนาท", aliases: &["chai nat", "chainat"] },
    ProvinceAliasEntry { canonical: "ชัยภูมิ", aliases: &["chaiyaphum"] },
    ProvinceAliasEntry { canonical: "ชุมพร", aliases: &["chumphon"] },
    ProvinceAliasEntry { canonical: "เชียงราย", aliases: &["chiang rai", "chiangrai"] },
    ProvinceAliasEntry { canonical: "เชียงใหม่", aliases: &["chiang mai", "chiangmai"] },
    ProvinceAliasEntry { canonical: "ตรัง", aliases: &["trang"] },
    ProvinceAliasEntry { canonical: "ตราด", aliases: &["trat"] },
    ProvinceAliasEntry { canonical: "ตาก", aliases: &["tak"] },
    ProvinceAliasEntry { canonical: "นครนายก", aliases: &["nakhon nayok", "nakhonnayok"] },
    ProvinceAliasEntry { canonical: "นครปฐม", aliases: &["nakhon pathom", "nakhonpathom"] },
    ProvinceAliasEntry { canonical: "นครพนม", aliases: &["nakhon phanom", "nakhonphanom"] },
    ProvinceAliasEntry { canonical: "นครราชสีมา", aliases: &["nakhon ratchasima", "nakhonratchasima", "korat"] },
    ProvinceAliasEntry { canonical: "นครศรีธรรมราช", aliases: &["nakhon si thammarat", "nakhonsithammarat"] },
    ProvinceAliasEntry { canonical: "นครสวรรค์", aliases: &["nakhon sawan", "nakhonsawan"] },
    ProvinceAliasEntry { canonical: "นนทบุรี", aliases: &["nonthaburi"] },
    ProvinceAliasEntry { canonical: "นราธิวาส", aliases: &["narathiwat"] },
    ProvinceAliasEntry { canonical: "น่าน", aliases: &["nan"] },
    ProvinceAliasEntry { canonical: "บึงกาฬ", aliases: &["bueng kan", "buengkan"] },
    ProvinceAliasEntry { canonical: "บุรีรัมย์", aliases: &["buri ram", "buriram"] },
    ProvinceAliasEntry { canonical: "ปทุมธานี", aliases: &["pathum thani", "pathumthani"] },
    ProvinceAliasEntry { canonical: "ประจวบคีรีขันธ์", aliases: &["prachuap khiri khan", "prachuapkhirikhan"] },
    ProvinceAliasEntry { canonical: "ปราจีนบุรี", aliases: &["prachin buri", "prachinburi"] },
    ProvinceAliasEntry { canonical: "ปัตตานี", aliases: &["pattani"] },
    ProvinceAliasEntry { canonical: "พระนครศรีอยุธยา", aliases: &["phra nakhon si ayutthaya", "ayutthaya", "phra nakhon si ayutaya"] },
    ProvinceAliasEntry { canonical: "พะเยา", aliases: &["phayao"] },
    ProvinceAliasEntry { canonical: "พังงา", aliases: &["phang nga", "phangnga"] },
    ProvinceAliasEntry { canonical: "พัทลุง", aliases: &["phatthalung"] },
    ProvinceAliasEntry { canonical: "พิจิตร", aliases: &["phichit"] },
    ProvinceAliasEntry { canonical: "พิษณุโลก", aliases: &["phitsanulok"] },
    ProvinceAliasEntry { canonical: "เพชรบุรี", aliases: &["phetchaburi"] },
    ProvinceAliasEntry { canonical: "เพชรบูรณ์", aliases: &["phetchabun"] },
    ProvinceAliasEntry { canonical: "แพร่", aliases: &["phrae"] },
    ProvinceAliasEntry { canonical: "ภูเก็ต", aliases: &["phuket"] },
    ProvinceAliasEntry { canonical: "มหาสารคาม", aliases: &["maha sarakham", "mahasarakham"] },
    ProvinceAliasEntry { canonical: "มุกดาหาร", aliases: &["mukdahan"] },
    ProvinceAliasEntry { canonical: "แม่ฮ่องสอน", aliases: &["mae hong son", "maehongson"] },
    ProvinceAliasEntry { canonical: "ยะลา", aliases: &["yala"] },
    ProvinceAliasEntry { canonical: "ยโสธร", aliases: &["yasothon"] },
    ProvinceAliasEntry { canonical: "ร้อยเอ็ด", aliases: &["roi et", "roiet"] },
    ProvinceAliasEntry { canonical: "ระนอง", aliases: &["ranong"] },
    ProvinceAliasEntry { canonical: "ระยอง", aliases: &["rayong"] },
    ProvinceAliasEntry { canonical: "ราชบุรี", aliases: &["ratchaburi"] },
    ProvinceAliasEntry { canonical: "ลพบุรี", aliases: &["lop buri", "lopburi"] },
    ProvinceAliasEntry { canonical: "ลำปาง", aliases: &["lampang"] },
    ProvinceAliasEntry { canonical: "ลำพูน", aliases: &["lamphun"] },
    ProvinceAliasEntry { canonical: "เลย", aliases: &["loei"] },
    ProvinceAliasEntry { canonical: "ศรีสะเกษ", aliases: &["sisaket", "si sa ket", "si saket"] },
    ProvinceAliasEntry { canonical: "สกลนคร", aliases: &["sakon nakhon", "sakonnakhon"] },
    ProvinceAliasEntry { canonical: "สงขลา", aliases: &["songkhla"] },
    ProvinceAliasEntry { canonical: "สตูล", aliases: &["satun"] },
    ProvinceAliasEntry { canonical: "สมุทรปราการ", aliases: &["samut prakan", "samutprakan"] },
    ProvinceAliasEntry { canonical: "สมุทรสงคราม", aliases: &["samut songkhram", "samutsongkhram"] },
    ProvinceAliasEntry { canonical: "สมุทรสาคร", aliases: &["samut sakhon", "samutsakhon"] },
    ProvinceAliasEntry { canonical: "สระบุรี", aliases: &["saraburi"] },
    ProvinceAliasEntry { canonical: "สระแก้ว", aliases: &["sa kaeo", "sakaeo"] },
    ProvinceAliasEntry { canonical: "สิงห์บุรี", aliases: &["sing buri", "singburi"] },
    ProvinceAliasEntry { canonical: "สุโขทัย", aliases: &["sukhothai"] },
    ProvinceAliasEntry { canonical: "สุพรรณบุรี", aliases: &["suphan buri", "suphanburi"] },
    ProvinceAliasEntry { canonical: "สุราษฎร์ธานี", aliases: &["surat thani", "suratthani"] },
    ProvinceAliasEntry { canonical: "สุรินทร์", aliases: &["surin"] },
    ProvinceAliasEntry { canonical: "หนองคาย", aliases: &["nong khai", "nongkhai"] },
    ProvinceAliasEntry { canonical: "หนองบัวลำภู", aliases: &["nong bua lam phu", "nongbualamphu"] },
    ProvinceAliasEntry { canonical: "อ่างทอง", aliases: &["ang thong", "angthong"] },
    ProvinceAliasEntry { canonical: "อำนาจเจริญ", aliases: &["amnat charoen", "amnacharoen", "amnat charern"] },
    ProvinceAliasEntry { canonical: "อุดรธานี", aliases: &["udon thani", "udonthani"] },
    ProvinceAliasEntry { canonical: "อุทัยธานี", aliases: &["uthai thani", "uthaithani"] },
    ProvinceAliasEntry { canonical: "อุตรดิตถ์", aliases: &["uttaradit"] },
    ProvinceAliasEntry { canonical: "อุบลราชธานี", aliases: &["ubon ratchathani", "ubonratchathani"] },
    ProvinceAliasEntry { canonical: LAOS, aliases: &["laos", "lao", "lao pdr", "ລາວ"] },
];

/// Lower-cased, whitespace-free lookup key.
pub fn lookup_key(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Key -> index into `PROVINCES`, covering canonical names and every alias.
///
/// Earlier entries win when two entries share a key, matching a first-match scan of the table.
static INDEX: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    let mut index = HashMap::new();
    for (i, entry) in PROVINCES.iter().enumerate() {
        index.entry(lookup_key(entry.canonical)).or_insert(i);
        for alias in entry.aliases {
            index.entry(lookup_key(alias)).or_insert(i);
        }
    }
    index
});

/// Finds the entry whose canonical name or alias matches `text`, ignoring case and whitespace.
pub fn find_entry(text: &str) -> Option<&'static ProvinceAliasEntry> {
    let key = lookup_key(text);
    if key.is_empty() {
        return None;
    }
    INDEX.get(&key).map(|&i| &PROVINCES[i])
}

/// Known aliases of a canonical name (case-insensitive), or an empty slice.
pub fn aliases_of(canonical: &str) -> &'static [&'static str] {
    PROVINCES
        .iter()
        .find(|e| e.canonical.to_lowercase() == canonical.to_lowercase())
        .map(|e| e.aliases)
        .unwrap_or(&[])
}
