// Static reference data: survey city codes and map coordinates.
//
// Everything here is built once per process and shared read-only; the
// normalizer, loader, and geo-join all take a `&Registries` explicitly.
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// Survey city codes as published across waves. Several generations of
/// codes alias the same city, and a few keys are defined more than once;
/// `CodeRegistry::from_definitions` keeps the last definition.
const CITY_CODE_DEFINITIONS: &[(i64, &str)] = &[
    (20130201, "Beijing"), (2013020101, "Beijing"), (2013020102, "Beijing"), (2013020103, "Beijing"),
    (20110201, "Shanghai"), (2011020101, "Shanghai"), (2011020102, "Shanghai"), (20132601, "Tianjin"),
    (2013260101, "Tianjin"), (2013260102, "Tianjin"), (20131601, "Chongqing"), (2013160101, "Chongqing"),
    (2013160102, "Chongqing"), (20170301, "Shijiazhuang"), (2017030101, "Shijiazhuang"), (20170307, "Tangshan"),
    (2017030701, "Tangshan"), (20170308, "Qinhuangdao"), (2017030801, "Qinhuangdao"), (20170314, "Baoding"),
    (2017031401, "Baoding"), (20131001, "Taiyuan"), (2013100101, "Taiyuan"), (20131002, "Datong"),
    (2013100201, "Datong"), (20130501, "Huhehaote"), (2013050101, "Huhehaote"), (20130509, "Baotou"),
    (2013050901, "Baotou"), (20170601, "Shenyang"), (2017060101, "Shenyang"), (2017060111, "Dalian"),
    (201706111, "Dalian"), (20170701, "Changchun"), (2017070101, "Changchun"), (20170702, "Jilin"),
    (2017070201, "Jilin"), (20170801, "Harbin"), (2017080101, "Harbin"), (20170802, "Qiqihar"),
    (2017080201, "Qiqihar"), (20170803, "Jixi"), (2017080301, "Jixi"), (2017080302, "Jixi"),
    (20110901, "Harbin"), (20110902, "Harbin"), (2011090201, "Harbin"), (2011090202, "Harbin"),
    (20171001, "Nanjing"), (2017100101, "Nanjing"), (20171005, "Suzhou"), (2017100501, "Suzhou"),
    (2017100503, "Suzhou"), (20171101, "Hangzhou"), (2017110101, "Hangzhou"), (2017110106, "Ningbo"),
    (2017110601, "Ningbo"), (20130901, "Hefei"), (2013090101, "Hefei"), (20130902, "Wuhu"),
    (2013090201, "Wuhu"), (20171201, "Fuzhou"), (2017120101, "Fuzhou"), (20171202, "Xiamen"),
    (2017120201, "Xiamen"), (20130801, "Nanchang"), (2013080101, "Nanchang"), (20130802, "Jingdezhen"),
    (2013080201, "Jingdezhen"), (20171301, "Jinan"), (2017130101, "Jinan"), (20171302, "Qingdao"),
    (2017130201, "Qingdao"), (20131101, "Zhengzhou"), (2013110101, "Zhengzhou"), (2013110103, "Zhengzhou"),
    (20131102, "Kaifeng"), (2013110201, "Kaifeng"), (20131201, "Wuhan"), (2013120101, "Wuhan"),
    (20171701, "Wuhan"), (2017170101, "Wuhan"), (20131301, "Changsha"), (2013130101, "Changsha"),
    (20131302, "Zhuzhou"), (2013130201, "Zhuzhou"), (20171901, "Guangzhou"), (2017190101, "Guangzhou"),
    (20171914, "Shenzhen"), (2017191401, "Shenzhen"), (20150503, "Guangzhou"), (20150508, "Shenzhen"),
    (20130701, "Nanning"), (2013070101, "Nanning"), (20130704, "Liuzhou"), (2013070401, "Liuzhou"),
    (20110501, "Nanning"), (2011050101, "Nanning"), (20172001, "Haikou"), (2017200101, "Haikou"),
    (20172002, "Sanya"), (2017200201, "Sanya"), (20131701, "Chengdu"), (2013170101, "Chengdu"),
    (20131703, "Zigong"), (2013170301, "Zigong"), (20172301, "Chengdu"), (20172317, "Mianyang"),
    (2017231701, "Mianyang"), (2017231706, "Mianyang"), (20131501, "Guiyang"), (2013150101, "Guiyang"),
    (20131502, "Liupanshui"), (2013150201, "Liupanshui"), (20131401, "Kunming"), (2013140101, "Kunming"),
    (20131402, "Qujing"), (2013140201, "Qujing"), (20130201, "Lasa"), (2013020101, "Lasa"),
    (2013020103, "Lasa"), (20131801, "Xian"), (2013180101, "Xian"), (20131802, "Tongchuan"),
    (2013180201, "Tongchuan"), (20132305, "Xian"), (2013230501, "Xian"), (20130401, "Lanzhou"),
    (2013040101, "Lanzhou"), (20130402, "Jiayuguan"), (2013040201, "Jiayuguan"), (20110301, "Lanzhou"),
    (2011030101, "Lanzhou"), (20172801, "Lanzhou"), (2017280101, "Lanzhou"), (20172810, "Tianshui"),
    (2017281001, "Tianshui"), (20130301, "Xining"), (2013030101, "Xining"), (20130304, "Haidong"),
    (2013030401, "Haidong"), (20131901, "Yinchuan"), (2013190101, "Yinchuan"), (20131904, "Shizuishan"),
    (2013190401, "Shizuishan"), (20130601, "Urumqi"), (2013060101, "Urumqi"), (20130603, "Karamay"),
    (2013060301, "Karamay"), (20192304, "Guangzhou"), (20192101, "Shenzhen"), (20192102, "Zhuhai"),
    (20130106, "Beijing"), (20132802, "Shanghai"), (20151709, "Hangzhou"), (20152901, "Nanjing"),
    (20150103, "Wuhan"), (20132205, "Xian"), (20172501, "Chengdu"), (20191005, "Chongqing"),
    (20152102, "Tianjin"), (20152106, "Dalian"), (20132901, "Qingdao"), (20110805, "Shenyang"),
    (20132501, "Changchun"), (20132004, "Harbin"), (20111301, "Shijiazhuang"), (20150108, "Taiyuan"),
    (20110404, "Zhengzhou"), (20110402, "Changsha"), (20191001, "Fuzhou"), (20131302, "Nanchang"),
    (20111202, "Hefei"), (20152304, "Ningbo"), (20191603, "Xiamen"), (20150606, "Jinan"),
    (20132804, "Suzhou"), (20150906, "Wuxi"),];

const CITY_COORDINATES: &[(&str, f64, f64)] = &[
    ("Beijing", 116.40, 39.90), ("Shanghai", 121.48, 31.22), ("Tianjin", 117.20, 39.12),
    ("Chongqing", 106.55, 29.57), ("Shijiazhuang", 114.48, 38.03), ("Taiyuan", 112.54, 37.87),
    ("Huhehaote", 111.74, 40.84), ("Shenyang", 123.38, 41.80), ("Changchun", 125.35, 43.88),
    ("Harbin", 126.63, 45.75), ("Nanjing", 118.78, 32.04), ("Hangzhou", 120.19, 30.26),
    ("Hefei", 117.22, 31.82), ("Fuzhou", 119.30, 26.08), ("Nanchang", 115.85, 28.68),
    ("Jinan", 117.00, 36.65), ("Zhengzhou", 113.62, 34.75), ("Wuhan", 114.30, 30.60),
    ("Changsha", 112.93, 28.23), ("Guangzhou", 113.23, 23.16), ("Nanning", 108.36, 22.81),
    ("Haikou", 110.32, 20.03), ("Chengdu", 104.06, 30.67), ("Guiyang", 106.63, 26.64),
    ("Kunming", 102.83, 24.88), ("Lasa", 91.11, 29.97), ("Xian", 108.93, 34.27),
    ("Lanzhou", 103.83, 36.06), ("Xining", 101.77, 36.62), ("Yinchuan", 106.23, 38.48),
    ("Urumqi", 87.61, 43.82), ("Dalian", 121.62, 38.92), ("Qingdao", 120.33, 36.07),
    ("Ningbo", 121.55, 29.88), ("Xiamen", 118.10, 24.46), ("Shenzhen", 114.07, 22.62),
    ("Suzhou", 120.62, 31.32), ("Wuxi", 120.30, 31.57), ("Foshan", 113.12, 23.02),
    ("Dongguan", 113.75, 23.04), ("Tangshan", 118.18, 39.63), ("Yantai", 121.39, 37.52),
    ("Wenzhou", 120.70, 28.00), ("Quanzhou", 118.58, 24.93), ("Changzhou", 119.95, 31.78),
    ("Xuzhou", 117.20, 34.26), ("Weifang", 119.10, 36.70), ("Zibo", 118.05, 36.78),
    ("Shaoxing", 120.58, 30.01), ("Taizhou", 121.42, 28.65), ("Jinhua", 119.65, 29.08),
    ("Jiaxing", 120.75, 30.75), ("Huzhou", 120.08, 30.90), ("Yangzhou", 119.42, 32.39),
    ("Zhenjiang", 119.45, 32.20), ("Taizhou", 119.90, 32.49), ("Yancheng", 120.13, 33.38),
    ("Huaian", 119.02, 33.62), ("Lianyungang", 119.22, 34.60), ("Suqian", 118.28, 33.97),
    ("Quzhou", 118.87, 28.97), ("Zhoushan", 122.20, 30.00), ("Lishui", 119.92, 28.45),
    ("Baotou", 109.82, 40.65), ("Anshan", 122.85, 41.12), ("Fushun", 123.97, 41.97),
    ("Jilin", 126.57, 43.87), ("Qiqihar", 123.97, 47.33), ("Daqing", 125.03, 46.58),
    ("Mudanjiang", 129.58, 44.58), ("Jinzhou", 121.13, 41.10), ("Yingkou", 122.23, 40.67),
    ("Fuxin", 121.67, 42.02), ("Liaoyang", 123.17, 41.27), ("Panjin", 122.07, 41.12),
    ("Tieling", 123.85, 42.32), ("Chaoyang", 120.45, 41.58), ("Huludao", 120.83, 40.72),];

const PROVINCE_COORDINATES: &[(&str, f64, f64)] = &[
    ("Beijing", 116.40, 39.90), ("Tianjin", 117.20, 39.12), ("Hebei", 114.48, 38.03),
    ("Shanxi", 112.53, 37.87), ("Neimenggu", 111.65, 40.82), ("Liaoning", 123.38, 41.80),
    ("Jilin", 125.35, 43.88), ("Heilongjiang", 126.63, 45.75), ("Shanghai", 121.48, 31.22),
    ("Jiangsu", 118.78, 32.04), ("Zhejiang", 120.19, 30.26), ("Anhui", 117.27, 31.86),
    ("Fujian", 119.30, 26.08), ("Jiangxi", 115.89, 28.68), ("Shandong", 117.00, 36.65),
    ("Henan", 113.65, 34.76), ("Hubei", 114.31, 30.52), ("Hunan", 113.00, 28.21),
    ("Guangdong", 113.23, 23.16), ("Guangxi", 108.33, 22.84), ("Hainan", 110.35, 20.02),
    ("Chongqing", 106.54, 29.59), ("Sichuan", 104.06, 30.67), ("Guizhou", 106.71, 26.57),
    ("Yunnan", 102.73, 25.04), ("Xizang", 91.11, 29.97), ("Shaanxi", 108.95, 34.27),
    ("Gansu", 103.73, 36.03), ("Qinghai", 101.74, 36.56), ("Ningxia", 106.27, 38.47),
    ("Xinjiang", 87.68, 43.77), ("Xianggang", 114.17, 22.28), ("Aomen", 113.54, 22.19),
    ("Taiwan", 121.50, 25.03),];

/// Alternative Latin spellings that should land on a registry key.
const CITY_ALIASES: &[(&str, &str)] = &[
    ("haerbin", "Harbin"),
    ("wulumuqi", "Urumqi"),
    ("qiqihaer", "Qiqihar"),
    ("xi'an", "Xian"),
    ("hohhot", "Huhehaote"),
    ("lhasa", "Lasa"),
    ("peking", "Beijing"),
    ("canton", "Guangzhou"),
    ("amoy", "Xiamen"),
    ("huai'an", "Huaian"),
];

const PROVINCE_ALIASES: &[(&str, &str)] = &[
    ("inner mongolia", "Neimenggu"),
    ("nei mongol", "Neimenggu"),
    ("tibet", "Xizang"),
    ("hong kong", "Xianggang"),
    ("macau", "Aomen"),
    ("macao", "Aomen"),
];

static BUILTIN: Lazy<Registries> = Lazy::new(|| Registries {
    codes: CodeRegistry::from_definitions(CITY_CODE_DEFINITIONS.iter().copied()),
    cities: CoordinateRegistry::from_entries(CITY_COORDINATES.iter().copied())
        .with_aliases(CITY_ALIASES.iter().copied()),
    provinces: CoordinateRegistry::from_entries(PROVINCE_COORDINATES.iter().copied())
        .with_aliases(PROVINCE_ALIASES.iter().copied()),
});

/// Bundle of every reference table the pipeline consults.
#[derive(Debug, Clone)]
pub struct Registries {
    pub codes: CodeRegistry,
    pub cities: CoordinateRegistry,
    pub provinces: CoordinateRegistry,
}

impl Registries {
    /// The bundled tables, built on first use.
    pub fn builtin() -> &'static Registries {
        &BUILTIN
    }
}

/// Numeric survey code -> canonical city name.
#[derive(Debug, Clone, Default)]
pub struct CodeRegistry {
    names: HashMap<i64, String>,
}

impl CodeRegistry {
    /// Build from raw definitions in source order. A key defined twice keeps
    /// the later name.
    pub fn from_definitions<'a>(defs: impl IntoIterator<Item = (i64, &'a str)>) -> Self {
        let mut names = HashMap::new();
        for (code, name) in defs {
            if let Some(previous) = names.insert(code, name.to_string()) {
                if previous != name {
                    log::debug!("city code {code} redefined: {previous} -> {name}");
                }
            }
        }
        CodeRegistry { names }
    }

    pub fn lookup(&self, code: i64) -> Option<&str> {
        self.names.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

/// Canonical place name -> coordinate, iterated in definition order.
///
/// Order matters: fuzzy reconciliation and the province geo-join take the
/// first key that matches.
#[derive(Debug, Clone, Default)]
pub struct CoordinateRegistry {
    entries: Vec<(String, Coordinate)>,
    index: HashMap<String, usize>,
    folded: HashMap<String, usize>,
    aliases: HashMap<String, String>,
}

impl CoordinateRegistry {
    /// A name listed twice keeps its first position and its last coordinate.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, f64, f64)>) -> Self {
        let mut reg = CoordinateRegistry::default();
        for (name, longitude, latitude) in entries {
            let coord = Coordinate { longitude, latitude };
            match reg.index.get(name) {
                Some(&i) => reg.entries[i].1 = coord,
                None => {
                    let i = reg.entries.len();
                    reg.entries.push((name.to_string(), coord));
                    reg.index.insert(name.to_string(), i);
                    reg.folded.entry(name.to_lowercase()).or_insert(i);
                }
            }
        }
        reg
    }

    /// Register alternative spellings. Aliases pointing at unknown keys are
    /// ignored.
    pub fn with_aliases<'a>(mut self, aliases: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        for (alias, key) in aliases {
            if self.index.contains_key(key) {
                self.aliases.insert(alias.to_lowercase(), key.to_string());
            } else {
                log::warn!("alias {alias:?} points at unknown registry key {key:?}");
            }
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Coordinate> {
        self.index.get(name).map(|&i| self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Coordinate)> + '_ {
        self.entries.iter().map(|(k, c)| (k.as_str(), *c))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact key, then case-insensitive key.
    pub fn find_key(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        if let Some(&i) = self.index.get(name) {
            return Some(self.entries[i].0.as_str());
        }
        self.folded
            .get(&name.to_lowercase())
            .map(|&i| self.entries[i].0.as_str())
    }

    /// Registry key an alternative spelling stands for.
    pub fn alias_target(&self, name: &str) -> Option<&str> {
        self.aliases
            .get(&name.trim().to_lowercase())
            .and_then(|key| self.index.get(key.as_str()))
            .map(|&i| self.entries[i].0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_code_definition_wins() {
        let reg = CodeRegistry::from_definitions([(1, "Beijing"), (2, "Tianjin"), (1, "Lasa")]);
        assert_eq!(reg.lookup(1), Some("Lasa"));
        assert_eq!(reg.lookup(2), Some("Tianjin"));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn duplicate_coordinate_keeps_position_takes_last_value() {
        let reg = CoordinateRegistry::from_entries([
            ("Taizhou", 121.42, 28.65),
            ("Wuxi", 120.30, 31.57),
            ("Taizhou", 119.90, 32.49),
        ]);
        assert_eq!(reg.keys().collect::<Vec<_>>(), vec!["Taizhou", "Wuxi"]);
        assert_eq!(reg.get("Taizhou").map(|c| c.latitude), Some(32.49));
    }

    #[test]
    fn find_key_folds_case_and_aliases_resolve() {
        let reg = Registries::builtin();
        assert_eq!(reg.cities.find_key("beijing"), Some("Beijing"));
        assert_eq!(reg.cities.find_key("Haerbin"), None);
        assert_eq!(reg.cities.alias_target("Haerbin"), Some("Harbin"));
        assert_eq!(reg.provinces.alias_target("Tibet"), Some("Xizang"));
        assert_eq!(reg.cities.find_key("Atlantis"), None);
    }

    #[test]
    fn builtin_tables_are_populated() {
        let reg = Registries::builtin();
        assert!(!reg.codes.is_empty());
        assert!(reg.cities.contains("Xian"));
        assert!(reg.provinces.contains("Shaanxi"));
    }
}
