use once_cell::sync::Lazy;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::model::{Conditions, EntryListRow, Event, LegResultRow, ResultRow};
use crate::normalize::{self, RowOutcome, SkipReason};

static SEASON_EVENT: Lazy<Selector> = Lazy::new(|| selector("div.season-event"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a"));
static SPAN: Lazy<Selector> = Lazy::new(|| selector("span"));
static ROW: Lazy<Selector> = Lazy::new(|| selector("tr"));
static CELL: Lazy<Selector> = Lazy::new(|| selector("td"));
static ENTRY_CELL: Lazy<Selector> = Lazy::new(|| selector("td.final-entry"));
static NUMBER_CELL: Lazy<Selector> = Lazy::new(|| selector("td.final-results-number"));
static POSITION_CELL: Lazy<Selector> = Lazy::new(|| selector("td.font-weight-bold.text-left"));
static BOLD_CELL: Lazy<Selector> = Lazy::new(|| selector("td.font-weight-bold"));
static CAR_CELL: Lazy<Selector> = Lazy::new(|| selector("td.final-results-car"));
static TIMES_CELL: Lazy<Selector> = Lazy::new(|| selector("td.final-results-times"));
static IMAGE: Lazy<Selector> = Lazy::new(|| selector("img"));

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|err| panic!("invalid static selector `{css}`: {err}"))
}

/// Events of one season listing. Rounds follow listing order, so a malformed
/// block still consumes its round number.
pub fn parse_season(html: &str, season: i32) -> Vec<RowOutcome<Event>> {
    let doc = Html::parse_document(html);
    doc.select(&SEASON_EVENT)
        .enumerate()
        .map(|(idx, block)| parse_event(block, season, idx as u32 + 1))
        .collect()
}

fn parse_event(block: ElementRef<'_>, season: i32, round: u32) -> RowOutcome<Event> {
    let title = block
        .select(&LINK)
        .next()
        .ok_or(SkipReason::Missing("event link"))?;
    let url = title
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .ok_or(SkipReason::Missing("event url"))?;
    let name = normalize::collapse_ws(&text_of(title));
    if name.is_empty() {
        return Err(SkipReason::Empty("event name"));
    }
    let conditions = block
        .select(&SPAN)
        .next()
        .map(|span| normalize::conditions_from_label(&text_of(span)))
        .unwrap_or_default();

    Ok(Event {
        season,
        round,
        name,
        url: url.to_string(),
        conditions: Conditions::new(conditions),
    })
}

/// Final classification rows of one event.
pub fn parse_results(html: &str, event: &Event) -> Vec<RowOutcome<ResultRow>> {
    let doc = Html::parse_document(html);
    data_rows(&doc).map(|row| parse_result(row, event)).collect()
}

fn parse_result(row: ElementRef<'_>, event: &Event) -> RowOutcome<ResultRow> {
    let entry = first(row, &ENTRY_CELL, "entry cell")?;
    let link = first(entry, &LINK, "crew link")?;
    let (driver, codriver) = normalize::crew(crew_parts(link))?;
    let entry_number = normalize::entry_number(&text_of(first(row, &NUMBER_CELL, "entry number")?))?;
    let final_finish =
        normalize::finish_position(&text_of(first(row, &POSITION_CELL, "position")?))?;

    let car_cell = first(row, &CAR_CELL, "car")?;
    let car = car_cell
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(normalize::collapse_ws(text)),
            Node::Element(_) => ElementRef::wrap(child).map(|el| normalize::collapse_ws(&text_of(el))),
            _ => None,
        })
        .find(|text| !text.is_empty())
        .ok_or(SkipReason::Empty("car"))?;
    let tyre = car_cell.select(&IMAGE).find_map(|img| {
        let attrs = img.value();
        attrs
            .attr("title")
            .or_else(|| attrs.attr("alt"))
            .map(normalize::collapse_ws)
            .filter(|t| !t.is_empty())
    });

    let final_time = normalize::parse_time_secs(&first_token(first(row, &TIMES_CELL, "time")?)?)?;

    Ok(ResultRow {
        season: event.season,
        round: event.round,
        event_name: event.name.clone(),
        event_url: event.url.clone(),
        conditions: event.conditions.clone(),
        entry_number,
        driver,
        codriver,
        car,
        tyre,
        final_finish,
        final_time,
    })
}

/// Start order of one leg. `start_number` is the row's 1-based position among
/// the page's data rows, dropped rows included.
pub fn parse_entry_list(html: &str, event: &Event, leg: u32) -> Vec<RowOutcome<EntryListRow>> {
    let doc = Html::parse_document(html);
    data_rows(&doc)
        .enumerate()
        .map(|(idx, row)| parse_entry(row, event, leg, idx as u32 + 1))
        .collect()
}

fn parse_entry(
    row: ElementRef<'_>,
    event: &Event,
    leg: u32,
    start_number: u32,
) -> RowOutcome<EntryListRow> {
    let link = first(row, &LINK, "crew link")?;
    let (driver, codriver) = normalize::crew(crew_parts(link))?;
    let entry_number = normalize::entry_number(&text_of(first(row, &NUMBER_CELL, "entry number")?))?;

    // The last two bold cells are car then start time.
    let bolds = row.select(&BOLD_CELL).collect::<Vec<_>>();
    let [.., car_cell, time_cell] = bolds.as_slice() else {
        return Err(SkipReason::Missing("car and start time"));
    };
    let car = normalize::collapse_ws(&text_of(*car_cell));
    if car.is_empty() {
        return Err(SkipReason::Empty("car"));
    }
    let start_time = normalize::collapse_ws(&text_of(*time_cell));
    if start_time.is_empty() {
        return Err(SkipReason::Empty("start time"));
    }

    Ok(EntryListRow {
        season: event.season,
        round: event.round,
        leg,
        start_number,
        entry_number,
        driver,
        codriver,
        car,
        start_time,
    })
}

/// Classification rows of one leg.
pub fn parse_leg_results(html: &str, event: &Event, leg: u32) -> Vec<RowOutcome<LegResultRow>> {
    let doc = Html::parse_document(html);
    data_rows(&doc)
        .map(|row| parse_leg_result(row, event, leg))
        .collect()
}

fn parse_leg_result(row: ElementRef<'_>, event: &Event, leg: u32) -> RowOutcome<LegResultRow> {
    let entry_number = normalize::entry_number(&text_of(first(row, &NUMBER_CELL, "entry number")?))?;
    let leg_finish = normalize::finish_position(&text_of(first(row, &POSITION_CELL, "position")?))?;
    let leg_time = normalize::parse_time_secs(&first_token(first(row, &TIMES_CELL, "time")?)?)?;

    Ok(LegResultRow {
        season: event.season,
        round: event.round,
        leg,
        leg_finish,
        entry_number,
        leg_time,
    })
}

/// Rows with at least one `td`; header and layout rows are not candidates.
fn data_rows(doc: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    doc.select(&ROW).filter(|row| row.select(&CELL).next().is_some())
}

fn first<'a>(
    scope: ElementRef<'a>,
    selector: &Selector,
    what: &'static str,
) -> RowOutcome<ElementRef<'a>> {
    scope.select(selector).next().ok_or(SkipReason::Missing(what))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect()
}

fn first_token(cell: ElementRef<'_>) -> RowOutcome<String> {
    text_of(cell)
        .split_whitespace()
        .next()
        .map(str::to_string)
        .ok_or(SkipReason::Empty("time"))
}

/// Text of each child of the crew link, `span` labels left out.
fn crew_parts(link: ElementRef<'_>) -> Vec<String> {
    link.children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(String::from(&**text)),
            Node::Element(el) if el.name() != "span" => ElementRef::wrap(child).map(text_of),
            _ => None,
        })
        .collect()
}
