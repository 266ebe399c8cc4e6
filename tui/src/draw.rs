use crate::app::{App, CreateField, Screen};
use auction_client::create::FormFields;
use auction_client::scroll::Footer;
use auction_client::DetailModel;
use auction_core::{BidBlocker, BidControl};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

pub fn draw_ui(f: &mut Frame, app: &mut App) {
    let full = f.size();
    if full.height == 0 {
        return;
    }
    let regions = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(full);

    app.list_viewport = 0;
    if let Screen::Detail(view) = &app.screen {
        draw_detail(f, regions[0], &view.model());
    } else if matches!(app.screen, Screen::Create) {
        draw_create(f, regions[0], app);
    } else {
        draw_listing(f, regions[0], app);
    }
    draw_status_line(f, regions[1], app);
}

fn hint(text: &str) -> Line<'_> {
    Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
}

fn short_address(address: &str) -> String {
    if address.len() <= 14 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}…{}", &address[..8], &address[address.len() - 4..])
}

fn draw_listing(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let header = Paragraph::new(vec![hint(
        "↑/↓ select  Enter open  n new auction  r refresh  q quit",
    )])
    .block(
        Block::default()
            .title(Span::styled(
                format!("Auctions @ {}", short_address(&app.cfg.collection.factory_address)),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL),
    );
    f.render_widget(header, chunks[0]);

    let block = Block::default().title("Auctions").borders(Borders::ALL);
    if let Some(message) = app.listing.empty_message() {
        let para = Paragraph::new(message)
            .block(block)
            .wrap(Wrap { trim: true });
        f.render_widget(para, chunks[1]);
        return;
    }

    let cards = app.listing.cards();
    let viewport = chunks[1].height.saturating_sub(2) as usize;
    app.cursor.scroll_into_view(cards.len(), viewport);
    app.list_viewport = viewport;

    let mut items: Vec<ListItem> = cards
        .iter()
        .enumerate()
        .map(|(i, card)| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:>3}. {} ", i + 1, short_address(&card.id)),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw(card.label.clone()),
            ]))
        })
        .collect();
    let footer = app.listing.footer();
    let footer_style = match footer {
        Footer::Loading => Style::default().fg(Color::Yellow),
        Footer::EndOfList => Style::default().fg(Color::DarkGray),
    };
    items.push(ListItem::new(Line::from(Span::styled(
        footer.label(),
        footer_style,
    ))));

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));
    let mut state = ListState::default()
        .with_offset(app.cursor.offset)
        .with_selected((!cards.is_empty()).then_some(app.cursor.selected));
    f.render_stateful_widget(list, chunks[1], &mut state);
}

fn format_remaining(secs: i64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else {
        format!("{}m {:02}s", m, s)
    }
}

fn draw_detail(f: &mut Frame, area: Rect, model: &DetailModel) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Length(4), Constraint::Min(3)])
        .split(area);

    let badge_style = if model.badge == "Live" {
        Style::default().fg(Color::Black).bg(Color::Green)
    } else {
        Style::default().fg(Color::White).bg(Color::Red)
    };
    let mut ends = vec![Span::raw(format!("Ends: {}", model.ends_at))];
    if let Some(left) = model.remaining_secs.filter(|s| *s > 0) {
        ends.push(Span::styled(
            format!("  ({} left)", format_remaining(left)),
            Style::default().fg(Color::Gray),
        ));
    }
    let mut info_lines = vec![
        Line::from(vec![
            Span::styled(format!(" {} ", model.badge), badge_style),
            Span::raw(format!("  {}", model.address)),
        ]),
        Line::from(model.description.as_str()),
        Line::from(ends),
        Line::from(vec![
            Span::raw("Highest bid: "),
            Span::styled(
                format!("{} ETH", model.highest_bid),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
    ];
    if let Some(loading) = &model.loading {
        info_lines.push(hint(loading));
    }
    let info = Paragraph::new(info_lines)
        .block(Block::default().title("Auction").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(info, chunks[0]);

    let bid_lines = match &model.bid {
        BidControl::Hidden => vec![hint("Bidding has closed.")],
        BidControl::Enabled(_) => vec![
            Line::from(format!("Amount (ETH): {}_", model.bid_input)),
            hint("Enter place bid"),
        ],
        BidControl::Disabled(blocker) => {
            let reason = match blocker {
                BidBlocker::EmptyAmount => "type an amount".to_string(),
                BidBlocker::InvalidAmount(err) => err.to_string(),
                BidBlocker::Pending => "bid pending...".to_string(),
            };
            vec![
                Line::from(format!("Amount (ETH): {}_", model.bid_input)),
                Line::from(Span::styled(reason, Style::default().fg(Color::Yellow))),
            ]
        }
    };
    let bid = Paragraph::new(bid_lines).block(Block::default().title("Bid").borders(Borders::ALL));
    f.render_widget(bid, chunks[1]);

    let settle_style = if model.settle_emphasized {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default()
    };
    let mut lines = vec![
        Line::from(vec![
            Span::raw("[w] Withdraw funds   "),
            Span::styled("[s] Settle auction", settle_style),
            Span::raw("   [f] Force end"),
        ]),
        hint("a dismiss results  Esc back"),
    ];
    for (kind, status) in &model.runs {
        lines.push(Line::from(format!("{}: {}", kind.label(), status)));
    }
    if let Some(notice) = &model.notice {
        lines.push(Line::from(Span::styled(
            notice.as_str(),
            Style::default().fg(Color::Magenta),
        )));
    }
    let actions = Paragraph::new(lines)
        .block(Block::default().title("Actions").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(actions, chunks[2]);
}

fn field_line<'a>(label: &'a str, value: String, focused: bool) -> Line<'a> {
    let style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let cursor = if focused { "_" } else { "" };
    Line::from(vec![
        Span::styled(format!("{:<13}", label), style),
        Span::raw(format!("{}{}", value, cursor)),
    ])
}

fn draw_create(f: &mut Frame, area: Rect, app: &App) {
    let fields: FormFields = app.create.fields();
    let focus = app.create_focus;
    let mut lines = vec![
        field_line(
            "Description",
            fields.description.clone(),
            focus == CreateField::Description,
        ),
        field_line(
            "Beneficiary",
            fields.beneficiary.clone(),
            focus == CreateField::Beneficiary,
        ),
        field_line(
            "Duration",
            format!("< {} >", fields.duration_label()),
            focus == CreateField::Duration,
        ),
        Line::from(""),
        hint("Tab next field  ←/→ duration  Ctrl-a use my address  Enter create  Esc back"),
    ];
    if app.create.is_pending() {
        lines.push(Line::from(Span::styled(
            "Creating auction...",
            Style::default().fg(Color::Yellow),
        )));
    }
    if let Some(err) = app.create.last_error() {
        lines.push(Line::from(Span::styled(err, Style::default().fg(Color::Red))));
    }
    let form = Paragraph::new(lines)
        .block(Block::default().title("New auction").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(form, area);
}

fn draw_status_line(f: &mut Frame, area: Rect, app: &App) {
    let line = match &app.status {
        Some(message) => Line::from(Span::styled(message.as_str(), Style::default().fg(Color::Red))),
        None => hint(&app.cfg.rpc.url),
    };
    f.render_widget(Paragraph::new(line), area);
}
