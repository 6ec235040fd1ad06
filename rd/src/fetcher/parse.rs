//! Results-page parsing
//!
//! Extracts the ad ("power link") and website-type organic sections from a
//! rendered search results page. Selector structure follows the engine's
//! markup: ads under `#power_link_body`, organic result groups as `.sc_new`
//! sections of which only the `sp_nwebsite` (website) kind is read.

use scraper::{ElementRef, Html, Selector};

use crate::extract::{ExtractedPage, ResultEntry};

/// Parse a rendered results page into its ad and organic sections.
///
/// Missing or malformed sections yield empty lists, never errors: a page
/// without a power-link block simply has no ads.
pub fn parse_results(html: &str) -> ExtractedPage {
    let document = Html::parse_document(html);
    ExtractedPage {
        ads: parse_ads(&document),
        organic: parse_organic(&document),
    }
}

fn parse_ads(document: &Html) -> Vec<ResultEntry> {
    let item_sel = Selector::parse("#power_link_body li.lst").unwrap();
    let title_sel = Selector::parse("a.lnk_head .lnk_tit").unwrap();
    let url_sel = Selector::parse(".lnk_url").unwrap();
    let head_sel = Selector::parse("a.lnk_head").unwrap();

    let mut ads = Vec::new();
    for (index, item) in document.select(&item_sel).enumerate() {
        // Position reflects the slot on the page, so entries skipped for a
        // missing title still count toward later positions.
        let title = match item.select(&title_sel).next() {
            Some(el) => text_of(el),
            None => continue,
        };

        ads.push(ResultEntry {
            position: index as u32 + 1,
            title,
            display_url: item.select(&url_sel).next().map(text_of).unwrap_or_default(),
            link: item
                .select(&head_sel)
                .next()
                .and_then(|el| el.value().attr("href"))
                .unwrap_or_default()
                .to_string(),
        });
    }
    ads
}

fn parse_organic(document: &Html) -> Vec<ResultEntry> {
    // Website-type result groups only; other .sc_new groups (news, images,
    // shopping) are not part of the organic contract.
    let section_sel = Selector::parse(".sc_new.sp_nwebsite").unwrap();
    let item_sel = Selector::parse(".list_type .bx").unwrap();
    let title_sel = Selector::parse("a.link_tit").unwrap();
    let url_sel = Selector::parse("a.link_url").unwrap();

    let mut organic = Vec::new();
    for section in document.select(&section_sel) {
        for item in section.select(&item_sel) {
            let title_el = match item.select(&title_sel).next() {
                Some(el) => el,
                None => continue,
            };

            organic.push(ResultEntry {
                position: organic.len() as u32 + 1,
                title: text_of(title_el),
                display_url: item.select(&url_sel).next().map(text_of).unwrap_or_default(),
                link: title_el.value().attr("href").unwrap_or_default().to_string(),
            });
        }
    }
    organic
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
