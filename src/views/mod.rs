//! Server-rendered HTML
//!
//! Pages are assembled as plain strings: a full-document layout for initial
//! loads and bare fragments for htmx swaps. Friend-group save/load/delete is
//! purely client-side Alpine.js state persisted in localStorage; the server
//! never sees a group.

use crate::models::{CommonGamesReport, PlayerSummary};

/// Escapes text destined for HTML bodies or attribute values.
fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wraps a fragment in the full document shell.
pub fn base_layout(content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html data-theme="dark">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>WCWP - What Can We Play</title>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/@picocss/pico@2/css/pico.min.css">
  <script defer src="https://cdn.jsdelivr.net/npm/alpinejs@3.x.x/dist/cdn.min.js"></script>
  <script src="https://unpkg.com/htmx.org@2.0.3"></script>
</head>
<body>
  <div class="container">
    <main id="main-content">
      <div class="logo">WCWP</div>
      <h1>🎮 What Can We Play</h1>
      {content}
    </main>
  </div>
</body>
</html>"#
    )
}

pub fn loading_spinner(message: &str) -> String {
    format!(
        r#"<div class="loading"><div class="spinner"></div><p class="loading-message">{}</p></div>"#,
        escape(message)
    )
}

/// Landing page for signed-out visitors.
pub fn login_page() -> String {
    base_layout(
        r#"<div>
  <p class="intro-text">Sign in with your Steam account to find games you can play with your friends</p>
  <a class="steam-btn" href="/login">Sign in through Steam</a>
</div>"#,
    )
}

/// Alpine.js state for the friend selection page.
///
/// Holds the current selection, the search filter and the saved groups.
/// Groups live in localStorage under "friendGroups" and never touch the
/// server; double quotes only, the blob is embedded in a single-quoted
/// attribute.
const FRIEND_PICKER_STATE: &str = r#"{
  selectedFriends: [],
  searchQuery: "",
  groups: JSON.parse(localStorage.getItem("friendGroups") || "[]"),
  showSaveForm: false,
  newGroupName: "",
  selectedGroupIndex: "",
  get selectedCount() { return this.selectedFriends.length; },
  toggle(steamid) {
    const index = this.selectedFriends.indexOf(steamid);
    if (index === -1) { this.selectedFriends.push(steamid); }
    else { this.selectedFriends.splice(index, 1); }
  },
  saveGroup() {
    if (this.newGroupName.trim() && this.selectedFriends.length > 0) {
      this.groups.push({ name: this.newGroupName.trim(), steamIds: [...this.selectedFriends] });
      localStorage.setItem("friendGroups", JSON.stringify(this.groups));
      this.newGroupName = "";
      this.showSaveForm = false;
    }
  },
  loadGroup() {
    if (this.selectedGroupIndex !== "") {
      this.selectedFriends = [...this.groups[this.selectedGroupIndex].steamIds];
    }
  },
  deleteGroup() {
    if (this.selectedGroupIndex !== "") {
      this.groups.splice(this.selectedGroupIndex, 1);
      localStorage.setItem("friendGroups", JSON.stringify(this.groups));
      this.selectedGroupIndex = "";
      this.selectedFriends = [];
    }
  }
}"#;

fn friend_item(friend: &PlayerSummary) -> String {
    let steamid = escape(friend.steamid.as_str());
    let name = escape(&friend.personaname);
    let avatar = friend
        .avatar
        .as_deref()
        .map(|src| {
            format!(
                r#"<img class="friend-avatar" src="{}" alt="{}">"#,
                escape(src),
                name
            )
        })
        .unwrap_or_default();

    format!(
        r#"<div class="friend-item"
     :class="{{ selected: selectedFriends.includes('{steamid}') }}"
     x-show="'{lower_name}'.includes(searchQuery.toLowerCase())"
     @click="toggle('{steamid}')">
  {avatar}
  <div class="friend-info"><div class="friend-name">{name}</div></div>
  <div class="checkbox-icon"><span x-show="selectedFriends.includes('{steamid}')">✓</span></div>
</div>"#,
        lower_name = name.to_lowercase(),
    )
}

/// The friend selection fragment: saved groups, search, the list itself and
/// the submit form. Friends are listed alphabetically by persona name.
pub fn friends_fragment(friends: &[PlayerSummary]) -> String {
    let mut sorted: Vec<&PlayerSummary> = friends.iter().collect();
    sorted.sort_by_key(|f| f.personaname.to_lowercase());

    let items: String = sorted.iter().map(|f| friend_item(f)).collect();

    format!(
        r##"<div>
<div x-data='{state}'>
  <div class="groups-section" x-show="groups.length > 0 || showSaveForm">
    <div class="group-select-container" x-show="groups.length > 0">
      <select x-model="selectedGroupIndex" @change="loadGroup()">
        <option value="" selected>Select a group...</option>
        <template x-for="(group, index) in groups" :key="index">
          <option :value="index" x-text="group.name + ' (' + group.steamIds.length + ' friends)'"></option>
        </template>
      </select>
      <button type="button" @click="deleteGroup()" :disabled="selectedGroupIndex === ''" title="Delete selected group">Delete</button>
    </div>
    <div x-show="showSaveForm">
      <div class="save-group-form">
        <input type="text" placeholder="Group name..." x-model="newGroupName" @keyup.enter="saveGroup()">
        <button type="button" @click="saveGroup()">Save</button>
        <button class="secondary" type="button" @click="showSaveForm = false; newGroupName = ''">Cancel</button>
      </div>
    </div>
  </div>
  <div class="search-save-container">
    <div class="search-bar">
      <input type="text" placeholder="Search friends..." x-model="searchQuery">
      <button class="clear-search-btn" type="button" @click="searchQuery = ''" x-show="searchQuery !== ''">×</button>
    </div>
    <button class="save-group-btn" type="button" x-show="selectedCount > 0 && !showSaveForm" @click="showSaveForm = true">Save as group</button>
  </div>
  <form id="friends-form" method="POST" action="/select-games"
        hx-post="/select-games" hx-swap="innerHTML" hx-target="#main-content" hx-indicator="#submit-spinner">
    <input type="hidden" name="selected_friends" :value="selectedFriends.join(',')">
    <div class="friends-list">{items}</div>
    <div class="selected-count">
      <span x-text="selectedCount === 0 ? 'No friends selected' : selectedCount === 1 ? '1 friend selected' : selectedCount + ' friends selected'"></span>
      <span class="selected-count-link" x-show="selectedCount > 0">
        <a class="clear-selection-link" href="#" @click.prevent="selectedFriends = []">Clear selection</a>
      </span>
    </div>
    <button class="next-btn" type="submit" :disabled="selectedCount === 0">
      <span>Find games →</span>
      <span class="htmx-indicator spinner-container" id="submit-spinner"><div class="spinner spinner--small"></div></span>
    </button>
  </form>
</div>
<a class="secondary logout-button" href="/logout" role="button">Logout</a>
</div>"##,
        state = FRIEND_PICKER_STATE,
    )
}

pub fn friends_page(friends: &[PlayerSummary]) -> String {
    base_layout(&friends_fragment(friends))
}

/// Shell swapped in after friend selection; htmx loads the results into it.
pub fn games_page(friend_ids_param: &str) -> String {
    format!(
        r##"<div id="content-area">
  <div id="games-list"
       hx-get="/load-common-games?friend_ids={ids}"
       hx-trigger="load" hx-swap="innerHTML">{spinner}</div>
  <a class="back-button" href="/" role="button" hx-get="/load-friends" hx-target="#main-content">← Back to Friends</a>
</div>"##,
        ids = escape(friend_ids_param),
        spinner = loading_spinner("Finding common games..."),
    )
}

/// The ranked common-games list, or a friendly empty state.
pub fn common_games_list(report: &CommonGamesReport, share_token: &str) -> String {
    if report.games.is_empty() {
        return r#"<div class="no-games-message">
  <p>No common games found. 😢</p>
  <p class="no-games-subtitle">Try selecting different friends!</p>
</div>"#
            .to_string();
    }

    let total = report.total_users;
    let items: String = report
        .games
        .iter()
        .map(|entry| {
            let icon = match entry.game.icon_url() {
                Some(src) => format!(
                    r#"<img class="game-icon" src="{}" alt="{}">"#,
                    escape(&src),
                    escape(entry.game.display_name())
                ),
                None => r#"<div class="game-icon game-icon--placeholder"></div>"#.to_string(),
            };

            let badges: String = entry
                .owner_names
                .iter()
                .map(|name| format!(r#"<span class="owner-badge">{}</span>"#, escape(name)))
                .collect();

            let pct_class = if entry.owner_count == total { "full" } else { "partial" };
            let pct = entry.owner_count * 100 / total;

            format!(
                r#"<div class="game-list">
  {icon}
  <div class="game-info">
    <div class="game-name">{name}</div>
    <div class="game-owner-count">{owners}/{total} people own this</div>
    <div class="owner-badges">{badges}</div>
  </div>
  <div class="game-percentage game-percentage--{pct_class}">{pct}%</div>
</div>"#,
                name = escape(entry.game.display_name()),
                owners = entry.owner_count,
            )
        })
        .collect();

    let plural = if report.games.len() == 1 { "" } else { "s" };

    format!(
        r#"<div>
  <h3 class="games-header">Found {count} game{plural}! 🎮</h3>
  <p class="games-description">Games ranked by how many people own them (hover to see who)</p>
  <div class="games-container">{items}</div>
  <a class="share-link" href="/load-common-games?share_data={token}">🔗 Share these results</a>
</div>"#,
        count = report.games.len(),
        token = escape(share_token),
    )
}

/// Remediation page for a private primary profile.
pub fn private_profile_page() -> String {
    r#"<div class="private-profile-container">
  <div class="private-profile-icon">🔒</div>
  <h2 class="private-profile-title">Your Profile is Private</h2>
  <p class="private-profile-description">To use this app, you need to set your Steam profile to public so we can see your friends list and games.</p>
  <div class="private-profile-instructions">
    <h3>How to make your profile public:</h3>
    <ol class="private-profile-list">
      <li>Go to your <a class="private-profile-link" href="https://steamcommunity.com/my/edit/settings" target="_blank">Steam Privacy Settings</a></li>
      <li>Set "My profile" to <strong>Public</strong></li>
      <li>Set "Game details" to <strong>Public</strong></li>
      <li>Set "Friends list" to <strong>Public</strong></li>
      <li>Click 'Save' and reload this page</li>
    </ol>
  </div>
  <button class="retry-button" onclick="window.location.reload();">Try again</button>
  <a class="secondary logout-button--secondary" href="/logout" role="button">Logout</a>
</div>"#
        .to_string()
}

pub fn invalid_link_notice() -> String {
    r#"<div class="no-games-message">
  <p>This share link is invalid or has been mangled. 🔗</p>
  <p class="no-games-subtitle">Ask your friend to send a fresh one!</p>
</div>"#
        .to_string()
}

pub fn error_notice(message: &str) -> String {
    format!(
        r#"<div class="no-games-message">
  <p>{}</p>
  <p class="no-games-subtitle"><a href="/">Back to start</a></p>
</div>"#,
        escape(message)
    )
}
